//! [In-memory implementation](Dataset) of [RDF datasets](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset) with set algebra.
//!
//! Usage example:
//! ```
//! use oxdelta::model::*;
//! use oxdelta::{Dataset, QuadPattern, ReadableDataset};
//!
//! let ex = NamedNodeRef::new("http://example.com")?;
//! let other = NamedNodeRef::new("http://example.com/other")?;
//!
//! let mut a = Dataset::new();
//! a.insert(QuadRef::new(ex, ex, ex, GraphNameRef::DefaultGraph));
//! a.insert(QuadRef::new(ex, ex, other, GraphNameRef::DefaultGraph));
//!
//! let mut b = Dataset::new();
//! b.insert(QuadRef::new(ex, ex, other, GraphNameRef::DefaultGraph));
//!
//! assert_eq!(a.intersection(&b), b);
//! assert!(a.is_superset(&b));
//! assert_eq!(a.quads_for_pattern(&QuadPattern::new().with_object(other.into_owned())).len(), 1);
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! ```

use crate::model::*;
use crate::pattern::QuadPattern;
use crate::updatable_dataset::{ReadableDataset, UpdatableDataset};
use std::convert::Infallible;
use std::fmt;

/// An in-memory set of unique quads.
///
/// Quads are compared structurally. Storage is delegated to [`oxrdf::Dataset`],
/// which keeps six permutation indexes over interned terms, so pattern lookups
/// with a bound slot do not scan the whole dataset.
///
/// <div class="warning">Terms are interned and never garbage collected:
/// inserting and removing a lot of different terms grows memory without any reduction.</div>
///
/// Usage example:
/// ```
/// use oxdelta::Dataset;
/// use oxdelta::model::*;
///
/// let mut dataset = Dataset::new();
/// let ex = NamedNodeRef::new("http://example.com")?;
/// let quad = QuadRef::new(ex, ex, ex, GraphNameRef::DefaultGraph);
/// assert!(dataset.insert(quad));
/// assert!(!dataset.insert(quad));
/// assert!(dataset.contains(quad));
/// assert_eq!(dataset.len(), 1);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct Dataset {
    inner: oxrdf::Dataset,
}

impl Dataset {
    /// Creates a new empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a quad to the dataset.
    ///
    /// Returns `true` if the quad was not already present.
    pub fn insert<'a>(&mut self, quad: impl Into<QuadRef<'a>>) -> bool {
        self.inner.insert(quad)
    }

    /// Removes a quad from the dataset.
    ///
    /// Returns `true` if the quad was present.
    pub fn remove<'a>(&mut self, quad: impl Into<QuadRef<'a>>) -> bool {
        self.inner.remove(quad)
    }

    /// Checks if the dataset contains the given quad.
    pub fn contains<'a>(&self, quad: impl Into<QuadRef<'a>>) -> bool {
        self.inner.contains(quad)
    }

    /// Returns the number of quads in this dataset.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Checks if this dataset contains no quad.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Removes all the quads.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Returns all the quads contained by the dataset.
    ///
    /// The order is unspecified but stable as long as the dataset is not mutated.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.inner.iter(),
        }
    }

    fn candidates<'a>(
        &'a self,
        pattern: &'a QuadPattern,
    ) -> Box<dyn Iterator<Item = QuadRef<'a>> + 'a> {
        if let Some(subject) = pattern.subject() {
            Box::new(self.inner.quads_for_subject(subject.as_ref()))
        } else if let Some(object) = pattern.object() {
            Box::new(self.inner.quads_for_object(object.as_ref()))
        } else if let Some(graph_name) = pattern.graph_name() {
            Box::new(self.inner.quads_for_graph_name(graph_name.as_ref()))
        } else if let Some(predicate) = pattern.predicate() {
            Box::new(self.inner.quads_for_predicate(predicate.as_ref()))
        } else {
            Box::new(self.inner.iter())
        }
    }
}

impl ReadableDataset for Dataset {
    type Iter<'a> = Iter<'a>;

    #[inline]
    fn iter(&self) -> Iter<'_> {
        Self::iter(self)
    }

    #[inline]
    fn len(&self) -> usize {
        Self::len(self)
    }

    #[inline]
    fn contains(&self, quad: QuadRef<'_>) -> bool {
        Self::contains(self, quad)
    }

    fn quads_for_pattern(&self, pattern: &QuadPattern) -> Dataset {
        self.candidates(pattern)
            .filter(|quad| pattern.matches(*quad))
            .collect()
    }
}

impl UpdatableDataset for Dataset {
    type Error = Infallible;

    #[inline]
    fn insert(&mut self, quad: QuadRef<'_>) -> Result<bool, Infallible> {
        Ok(Self::insert(self, quad))
    }

    #[inline]
    fn remove(&mut self, quad: QuadRef<'_>) -> Result<bool, Infallible> {
        Ok(Self::remove(self, quad))
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|quad| other.contains(quad))
    }
}

impl Eq for Dataset {}

impl<'a> IntoIterator for &'a Dataset {
    type Item = QuadRef<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: Into<QuadRef<'a>>> FromIterator<T> for Dataset {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut dataset = Self::new();
        dataset.extend(iter);
        dataset
    }
}

impl<'a, T: Into<QuadRef<'a>>> Extend<T> for Dataset {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for quad in iter {
            self.insert(quad);
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for quad in self {
            writeln!(f, "{quad} .")?;
        }
        Ok(())
    }
}

/// Iterator returned by [`Dataset::iter`].
pub struct Iter<'a> {
    inner: oxrdf::dataset::Iter<'a>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = QuadRef<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
