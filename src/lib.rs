//! Samyama OGM
//!
//! Object-graph mapping between typed entities and RDF quads.
//!
//! # Architecture
//!
//! - `codec`: field values to literals and resources, and back
//! - `mapping`: entity and property metadata, fetch/cascade policies
//! - `convert`: the read path and the create/update/delete traversals
//! - `store`: the statement store contract and an in-memory store
//! - `sparql`: query parsing and evaluation for the in-memory store
//! - `database`: quad pattern, paginated and counted queries
//! - `template`: find, save and delete entities
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_ogm::{
//!     DynamicEntity, EntityRef, FieldDescriptor, MappingConfig, MemoryStore, NamedNode,
//!     SemanticTemplate, StaticMetadataProvider, TypeDescriptor, ValueKind,
//! };
//! use std::sync::Arc;
//!
//! let mut provider = StaticMetadataProvider::new();
//! provider.register_dynamic(
//!     TypeDescriptor::new("Wine")
//!         .with_namespace("http://example.org/wine#")
//!         .field(FieldDescriptor::id_field("uri"))
//!         .field(FieldDescriptor::simple("name", ValueKind::String)),
//! );
//!
//! let template = SemanticTemplate::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(provider),
//!     MappingConfig::default(),
//! )
//! .unwrap();
//!
//! let id = NamedNode::new("http://example.org/wine#merlot").unwrap();
//! let wine = EntityRef::new(
//!     DynamicEntity::new("Wine")
//!         .with("uri", id.clone())
//!         .with("name", "Merlot"),
//! );
//! template.save(&wine).unwrap();
//!
//! let loaded = template.find("Wine", &id).unwrap().unwrap();
//! assert_eq!(loaded.get("name").unwrap().as_str(), Some("Merlot"));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod convert;
pub mod database;
pub mod error;
pub mod mapping;
pub mod rdf;
pub mod sparql;
pub mod store;
pub mod template;

// Re-export main types for convenience
pub use codec::{
    CalendarPrecision, CodecError, CodecResult, FieldValue, ValueCodec, ValueKind, XsdCalendar,
};

pub use config::{ConfigError, ConfigResult, CountStrategy, MappingConfig};

pub use convert::{EntityStateTransmitter, EntityWriter, RdfDiff, RdfState, StateSnapshot};

pub use database::SemanticDatabase;

pub use error::{SemanticError, SemanticResult};

pub use mapping::{
    Cascade, Direction, DynamicEntity, EntityMetadata, EntityRef, FetchMode, FieldDescriptor,
    LazyEntity, MappingContext, MappingError, MappingPolicy, MappingResult, PropertyKind,
    PropertyMetadata, SemanticEntity, StaticMetadataProvider, TypeDescriptor,
    TypeMetadataProvider,
};

pub use rdf::{
    BlankNode, Literal, NamedNode, Namespace, NamespaceManager, Quad, QuadPattern, RdfFormat,
    RdfObject, RdfPredicate, RdfSubject, RdfTerm,
};

pub use sparql::{QuerySolution, SparqlError, SparqlQuery, SparqlResults};

pub use store::{MemoryStore, StatementStore, StoreConnection, StoreError, StoreResult};

pub use template::SemanticTemplate;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
        assert!(!version().is_empty());
    }
}
