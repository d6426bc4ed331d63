//! Quad patterns, their 16-way fan-out and their canonical string keys.

use crate::error::InvalidPatternKeyError;
use crate::model::*;
use std::fmt;

const SUBJECT_BIT: u8 = 0b1000;
const PREDICATE_BIT: u8 = 0b0100;
const OBJECT_BIT: u8 = 0b0010;
const GRAPH_NAME_BIT: u8 = 0b0001;

/// A quad template in which every position is either bound to a term or a wildcard.
///
/// Used both to query a dataset ([`ReadableDataset::quads_for_pattern`](crate::ReadableDataset::quads_for_pattern))
/// and to subscribe to its changes ([`SubscribableDataset::on`](crate::SubscribableDataset::on)).
///
/// ```
/// use oxdelta::QuadPattern;
/// use oxdelta::model::*;
///
/// let tom = NamedNode::new("http://example.com/Tom")?;
/// let pattern = QuadPattern::new().with_subject(tom.clone());
/// assert!(pattern.matches(QuadRef::new(
///     tom.as_ref(),
///     vocab::rdf::TYPE,
///     NamedNodeRef::new("http://example.com/Cat")?,
///     GraphNameRef::DefaultGraph
/// )));
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QuadPattern {
    subject: Option<Subject>,
    predicate: Option<NamedNode>,
    object: Option<Term>,
    graph_name: Option<GraphName>,
}

impl QuadPattern {
    /// The pattern matching every quad.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pattern from its four optional positions.
    #[inline]
    pub fn from_parts(
        subject: Option<Subject>,
        predicate: Option<NamedNode>,
        object: Option<Term>,
        graph_name: Option<GraphName>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph_name,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<Subject>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Into<NamedNode>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_object(mut self, object: impl Into<Term>) -> Self {
        self.object = Some(object.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_graph_name(mut self, graph_name: impl Into<GraphName>) -> Self {
        self.graph_name = Some(graph_name.into());
        self
    }

    #[inline]
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    #[inline]
    pub fn predicate(&self) -> Option<&NamedNode> {
        self.predicate.as_ref()
    }

    #[inline]
    pub fn object(&self) -> Option<&Term> {
        self.object.as_ref()
    }

    #[inline]
    pub fn graph_name(&self) -> Option<&GraphName> {
        self.graph_name.as_ref()
    }

    /// Checks if no position is bound.
    #[inline]
    pub fn is_wildcard(&self) -> bool {
        self.subject.is_none()
            && self.predicate.is_none()
            && self.object.is_none()
            && self.graph_name.is_none()
    }

    /// Checks if every bound position is equal to the matching quad component.
    pub fn matches(&self, quad: QuadRef<'_>) -> bool {
        self.subject
            .as_ref()
            .is_none_or(|s| s.as_ref() == quad.subject)
            && self
                .predicate
                .as_ref()
                .is_none_or(|p| p.as_ref() == quad.predicate)
            && self.object.as_ref().is_none_or(|o| o.as_ref() == quad.object)
            && self
                .graph_name
                .as_ref()
                .is_none_or(|g| g.as_ref() == quad.graph_name)
    }

    /// Returns the 16 patterns matching the given quad: every combination of
    /// its components and wildcards.
    ///
    /// The all-wildcard pattern comes first and the fully bound one last.
    ///
    /// ```
    /// use oxdelta::QuadPattern;
    /// use oxdelta::model::*;
    ///
    /// let ex = NamedNodeRef::new("http://example.com")?;
    /// let quad = QuadRef::new(ex, ex, ex, GraphNameRef::DefaultGraph);
    /// let patterns: Vec<_> = QuadPattern::fan_out(quad).collect();
    /// assert_eq!(patterns.len(), 16);
    /// assert!(patterns[0].is_wildcard());
    /// assert!(patterns.iter().all(|p| p.matches(quad)));
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn fan_out(quad: QuadRef<'_>) -> impl Iterator<Item = Self> + '_ {
        (0..16).map(move |mask| Self::masked(quad, mask))
    }

    pub(crate) fn masked(quad: QuadRef<'_>, mask: u8) -> Self {
        Self {
            subject: (mask & SUBJECT_BIT != 0).then(|| quad.subject.into_owned()),
            predicate: (mask & PREDICATE_BIT != 0).then(|| quad.predicate.into_owned()),
            object: (mask & OBJECT_BIT != 0).then(|| quad.object.into_owned()),
            graph_name: (mask & GRAPH_NAME_BIT != 0).then(|| quad.graph_name.into_owned()),
        }
    }

    /// Key of [`masked(quad, mask)`](Self::masked) without building the pattern.
    pub(crate) fn masked_key(quad: QuadRef<'_>, mask: u8) -> String {
        let mut key = String::new();
        write_key(
            &mut key,
            (mask & SUBJECT_BIT != 0).then_some(quad.subject),
            (mask & PREDICATE_BIT != 0).then_some(quad.predicate),
            (mask & OBJECT_BIT != 0).then_some(quad.object),
            (mask & GRAPH_NAME_BIT != 0).then_some(quad.graph_name),
        );
        key
    }

    /// Serializes the pattern to its canonical key.
    ///
    /// A wildcard is written `*`. A bound term is a kind tag (`N` IRI, `B` blank node,
    /// `L` literal, `D` default graph, `T` quoted triple) followed by its fields,
    /// each prefixed with its byte length. Two patterns have the same key if and only if they are equal.
    ///
    /// ```
    /// use oxdelta::QuadPattern;
    /// use oxdelta::model::*;
    ///
    /// let pattern = QuadPattern::new()
    ///     .with_subject(NamedNode::new("http://example.com/s")?)
    ///     .with_object(Literal::new_language_tagged_literal("chat", "fr")?);
    /// assert_eq!(pattern.to_key(), "N20:http://example.com/s*L4:chat@2:fr*");
    /// assert_eq!(QuadPattern::from_key(&pattern.to_key())?, pattern);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn to_key(&self) -> String {
        let mut key = String::new();
        write_key(
            &mut key,
            self.subject.as_ref().map(Subject::as_ref),
            self.predicate.as_ref().map(NamedNode::as_ref),
            self.object.as_ref().map(Term::as_ref),
            self.graph_name.as_ref().map(GraphName::as_ref),
        );
        key
    }

    /// Parses a key written by [`to_key`](Self::to_key).
    pub fn from_key(key: &str) -> Result<Self, InvalidPatternKeyError> {
        let mut reader = KeyReader { key, rest: key };
        let subject = reader.read_slot()?.map(|t| reader.subject(t)).transpose()?;
        let predicate = reader
            .read_slot()?
            .map(|t| reader.predicate(t))
            .transpose()?;
        let object = reader.read_slot()?.map(|t| reader.object(t)).transpose()?;
        let graph_name = reader
            .read_slot()?
            .map(|t| reader.graph_name(t))
            .transpose()?;
        if !reader.rest.is_empty() {
            return Err(reader.error("unexpected trailing content"));
        }
        Ok(Self {
            subject,
            predicate,
            object,
            graph_name,
        })
    }
}

impl From<QuadRef<'_>> for QuadPattern {
    /// The pattern matching exactly this quad.
    #[inline]
    fn from(quad: QuadRef<'_>) -> Self {
        Self::masked(quad, 0b1111)
    }
}

impl fmt::Display for QuadPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn slot(f: &mut fmt::Formatter<'_>, term: Option<&impl fmt::Display>) -> fmt::Result {
            match term {
                Some(term) => write!(f, "{term}"),
                None => f.write_str("*"),
            }
        }
        slot(f, self.subject.as_ref())?;
        f.write_str(" ")?;
        slot(f, self.predicate.as_ref())?;
        f.write_str(" ")?;
        slot(f, self.object.as_ref())?;
        f.write_str(" ")?;
        slot(f, self.graph_name.as_ref())
    }
}

fn write_key(
    out: &mut String,
    subject: Option<SubjectRef<'_>>,
    predicate: Option<NamedNodeRef<'_>>,
    object: Option<TermRef<'_>>,
    graph_name: Option<GraphNameRef<'_>>,
) {
    match subject {
        Some(subject) => write_term(out, subject.into()),
        None => out.push('*'),
    }
    match predicate {
        Some(predicate) => write_term(out, predicate.into()),
        None => out.push('*'),
    }
    match object {
        Some(object) => write_term(out, object),
        None => out.push('*'),
    }
    match graph_name {
        Some(GraphNameRef::NamedNode(node)) => write_term(out, node.into()),
        Some(GraphNameRef::BlankNode(node)) => write_term(out, node.into()),
        Some(GraphNameRef::DefaultGraph) => out.push('D'),
        None => out.push('*'),
    }
}

fn write_term(out: &mut String, term: TermRef<'_>) {
    match term {
        TermRef::NamedNode(node) => {
            out.push('N');
            write_field(out, node.as_str());
        }
        TermRef::BlankNode(node) => {
            out.push('B');
            write_field(out, node.as_str());
        }
        TermRef::Literal(literal) => {
            out.push('L');
            write_field(out, literal.value());
            if let Some(language) = literal.language() {
                out.push('@');
                write_field(out, language);
            } else {
                out.push('^');
                write_field(out, literal.datatype().as_str());
            }
        }
        #[cfg(feature = "rdf-star")]
        TermRef::Triple(triple) => {
            out.push('T');
            write_term(out, triple.subject.as_ref().into());
            write_term(out, triple.predicate.as_ref().into());
            write_term(out, triple.object.as_ref());
        }
    }
}

fn write_field(out: &mut String, value: &str) {
    out.push_str(&value.len().to_string());
    out.push(':');
    out.push_str(value);
}

/// A decoded bound slot, before checking it is allowed at its position.
enum Slot {
    Term(Term),
    DefaultGraph,
}

struct KeyReader<'a> {
    key: &'a str,
    rest: &'a str,
}

impl<'a> KeyReader<'a> {
    fn error(&self, reason: &'static str) -> InvalidPatternKeyError {
        InvalidPatternKeyError::new(self.key, reason)
    }

    fn read_slot(&mut self) -> Result<Option<Slot>, InvalidPatternKeyError> {
        if let Some(rest) = self.rest.strip_prefix('*') {
            self.rest = rest;
            return Ok(None);
        }
        if let Some(rest) = self.rest.strip_prefix('D') {
            self.rest = rest;
            return Ok(Some(Slot::DefaultGraph));
        }
        Ok(Some(Slot::Term(self.read_term()?)))
    }

    fn read_term(&mut self) -> Result<Term, InvalidPatternKeyError> {
        let rest = self.rest;
        let mut chars = rest.chars();
        let tag = chars.next().ok_or_else(|| self.error("missing slot"))?;
        self.rest = chars.as_str();
        match tag {
            'N' => Ok(NamedNode::new_unchecked(self.read_field()?).into()),
            'B' => Ok(BlankNode::new_unchecked(self.read_field()?).into()),
            'L' => {
                let value = self.read_field()?;
                if let Some(rest) = self.rest.strip_prefix('@') {
                    self.rest = rest;
                    let language = self.read_field()?;
                    Ok(Literal::new_language_tagged_literal_unchecked(value, language).into())
                } else if let Some(rest) = self.rest.strip_prefix('^') {
                    self.rest = rest;
                    let datatype = NamedNode::new_unchecked(self.read_field()?);
                    Ok(Literal::new_typed_literal(value, datatype).into())
                } else {
                    Err(self.error("a literal must have a language or a datatype"))
                }
            }
            #[cfg(feature = "rdf-star")]
            'T' => {
                let subject = self.read_term()?;
                let subject = self.subject(Slot::Term(subject))?;
                let predicate = self.read_term()?;
                let predicate = self.predicate(Slot::Term(predicate))?;
                let object = self.read_term()?;
                Ok(Triple::new(subject, predicate, object).into())
            }
            _ => Err(self.error("unknown term kind")),
        }
    }

    fn read_field(&mut self) -> Result<&'a str, InvalidPatternKeyError> {
        let (len, rest) = self
            .rest
            .split_once(':')
            .ok_or_else(|| self.error("missing field length"))?;
        let len = len
            .parse::<usize>()
            .map_err(|_| self.error("invalid field length"))?;
        let value = rest
            .get(..len)
            .ok_or_else(|| self.error("field shorter than its length"))?;
        self.rest = &rest[len..];
        Ok(value)
    }

    fn subject(&self, slot: Slot) -> Result<Subject, InvalidPatternKeyError> {
        match slot {
            Slot::Term(Term::NamedNode(node)) => Ok(node.into()),
            Slot::Term(Term::BlankNode(node)) => Ok(node.into()),
            #[cfg(feature = "rdf-star")]
            Slot::Term(Term::Triple(triple)) => Ok(Subject::Triple(triple)),
            Slot::Term(Term::Literal(_)) | Slot::DefaultGraph => {
                Err(self.error("the subject must be an IRI or a blank node"))
            }
        }
    }

    fn predicate(&self, slot: Slot) -> Result<NamedNode, InvalidPatternKeyError> {
        match slot {
            Slot::Term(Term::NamedNode(node)) => Ok(node),
            _ => Err(self.error("the predicate must be an IRI")),
        }
    }

    fn object(&self, slot: Slot) -> Result<Term, InvalidPatternKeyError> {
        match slot {
            Slot::Term(term) => Ok(term),
            Slot::DefaultGraph => Err(self.error("the default graph cannot be an object")),
        }
    }

    fn graph_name(&self, slot: Slot) -> Result<GraphName, InvalidPatternKeyError> {
        match slot {
            Slot::Term(Term::NamedNode(node)) => Ok(node.into()),
            Slot::Term(Term::BlankNode(node)) => Ok(node.into()),
            Slot::DefaultGraph => Ok(GraphName::DefaultGraph),
            Slot::Term(_) => Err(self.error("the graph name must be an IRI or a blank node")),
        }
    }
}
