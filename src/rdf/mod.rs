//! RDF primitives for the object-graph mapping layer
//!
//! This module provides:
//! - RDF terms and quads (subject-predicate-object-graph)
//! - Quad patterns with wildcards
//! - Namespace prefixes and relative name resolution
//! - Bulk ingestion parsers (Turtle, N-Triples, N-Quads, TriG, RDF/XML)
//!
//! # Example
//!
//! ```rust
//! use samyama_ogm::rdf::{Literal, NamedNode, Quad, QuadPattern, RdfPredicate};
//!
//! let subject = NamedNode::new("http://example.org/alice").unwrap();
//! let predicate = RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! let quad = Quad::triple(subject.clone(), predicate, Literal::new_simple_literal("Alice"));
//!
//! assert!(QuadPattern::subject(subject).matches(&quad));
//! ```

mod namespace;
mod serialization;
mod types;
pub mod vocab;

pub use types::{
    BlankNode, Literal, NamedNode, Quad, QuadPattern, RdfError, RdfObject, RdfPredicate,
    RdfResult, RdfSubject, RdfTerm,
};

pub use namespace::{is_absolute_iri, Namespace, NamespaceManager, PrefixError, PrefixResult};

pub use serialization::{ParseError, ParseResult, RdfFormat, RdfParser};

/// The `rdf:type` predicate
pub fn rdf_type() -> RdfPredicate {
    RdfPredicate::from(NamedNode::from(oxrdf::vocab::rdf::TYPE.into_owned()))
}
