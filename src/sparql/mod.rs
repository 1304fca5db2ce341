//! SPARQL query support
//!
//! Queries are parsed with spargebra and evaluated over any [`QuadSource`].
//! Only the algebra needed by the mapping layer is evaluated; everything
//! else is reported as [`SparqlError::Unsupported`].
//!
//! # Example
//!
//! ```rust
//! use samyama_ogm::rdf::{Literal, NamedNode, Quad};
//! use samyama_ogm::sparql::{SparqlExecutor, SparqlQuery};
//!
//! let quads = vec![Quad::triple(
//!     NamedNode::new("http://example.org/alice").unwrap(),
//!     NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap(),
//!     Literal::new_simple_literal("Alice"),
//! )];
//!
//! let query = SparqlQuery::parse(
//!     "PREFIX foaf: <http://xmlns.com/foaf/0.1/> SELECT ?name WHERE { ?person foaf:name ?name }",
//! )
//! .unwrap();
//! let results = SparqlExecutor::new(quads.as_slice()).execute(&query).unwrap();
//! assert_eq!(results.len(), 1);
//! ```

mod executor;
mod parser;
mod results;

pub use executor::{QuadSource, SparqlExecutor};
pub use parser::{QueryForm, SparqlQuery, COUNT_VARIABLE};
pub use results::{QuerySolution, SparqlResults};

use thiserror::Error;

/// SPARQL errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SparqlError {
    /// Query text is not valid SPARQL, or cannot be rewritten as asked
    #[error("Malformed query: {0}")]
    Malformed(String),

    /// Valid SPARQL outside the evaluated subset
    #[error("Unsupported query feature: {0}")]
    Unsupported(String),
}

pub type SparqlResult<T> = Result<T, SparqlError>;
