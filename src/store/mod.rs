//! Statement store contract
//!
//! The mapping layer reads and writes quads through a [`StatementStore`]. Each
//! operation opens one [`StoreConnection`], which acts as a unit of work:
//! additions and removals become visible to other connections on `commit`, and
//! are discarded on `rollback` or when the connection is dropped.

mod memory;

pub use memory::{MemoryConnection, MemoryStore};

use crate::rdf::{Namespace, NamedNode, ParseError, Quad, QuadPattern};
use crate::sparql::{SparqlError, SparqlQuery, SparqlResults};
use thiserror::Error;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Storage could not be reached or updated
    #[error("Store access error: {0}")]
    Access(String),

    /// No connection available
    #[error("Connection limit of {0} reached")]
    ConnectionLimit(usize),

    /// Bulk ingestion failed
    #[error("Ingestion failed: {0}")]
    Ingest(#[from] ParseError),

    /// Query could not be evaluated
    #[error("Query failed: {0}")]
    Query(#[from] SparqlError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Source of store connections
pub trait StatementStore: Send + Sync {
    /// Open a connection; it is released when dropped
    fn connection(&self) -> StoreResult<Box<dyn StoreConnection + '_>>;
}

/// Unit of work against a statement store
pub trait StoreConnection {
    /// Quads matching the pattern, including this connection's pending changes
    fn statements(&self, pattern: &QuadPattern) -> StoreResult<Vec<Quad>>;

    /// Stage quads for addition
    fn add(&mut self, quads: &[Quad]) -> StoreResult<()>;

    /// Stage quads for removal
    fn remove(&mut self, quads: &[Quad]) -> StoreResult<()>;

    /// Apply staged changes atomically
    fn commit(&mut self) -> StoreResult<()>;

    /// Discard staged changes
    fn rollback(&mut self) -> StoreResult<()>;

    /// Evaluate a query over the connection's view of the store
    fn evaluate(&self, query: &SparqlQuery) -> StoreResult<SparqlResults>;

    /// Number of quads
    fn size(&self) -> StoreResult<usize>;

    /// Named graphs holding at least one quad
    fn contexts(&self) -> StoreResult<Vec<NamedNode>>;

    fn namespaces(&self) -> StoreResult<Vec<Namespace>>;

    fn set_namespace(&mut self, prefix: &str, iri: &str) -> StoreResult<()>;

    /// Stage removal of every quad in the given graphs, or of all quads when
    /// `contexts` is empty
    fn clear(&mut self, contexts: &[NamedNode]) -> StoreResult<()>;

    /// True when `COUNT` aggregates are evaluated by the store itself
    fn supports_count_aggregate(&self) -> bool {
        false
    }
}
