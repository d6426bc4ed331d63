//! Implements data structures for [RDF 1.1 Concepts](https://www.w3.org/TR/rdf11-concepts/) using [OxRDF](https://crates.io/crates/oxrdf).
//!
//! Only the term and quad types are re-exported: [`Dataset`](crate::Dataset) replaces the OxRDF one.
//!
//! Usage example:
//!
//! ```
//! use oxdelta::model::*;
//!
//! let ex = NamedNodeRef::new("http://example.com")?;
//! let quad = QuadRef::new(ex, ex, ex, GraphNameRef::DefaultGraph);
//! assert_eq!(quad.into_owned().as_ref(), quad);
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! ```

pub use oxrdf::{
    BlankNode, BlankNodeIdParseError, BlankNodeRef, GraphName, GraphNameRef, IriParseError,
    LanguageTagParseError, Literal, LiteralRef, NamedNode, NamedNodeRef, NamedOrBlankNode,
    NamedOrBlankNodeRef, Quad, QuadRef, Subject, SubjectRef, Term, TermRef, Triple, TripleRef,
    vocab,
};
