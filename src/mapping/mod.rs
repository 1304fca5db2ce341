//! Entity and property metadata
//!
//! Type descriptors from a [`TypeMetadataProvider`] are turned into immutable
//! [`EntityMetadata`] once per type and cached by the [`MappingContext`]. Each
//! field becomes a [`PropertyMetadata`] tagged with a [`PropertyKind`], so the
//! read and write paths match on the kind instead of probing annotations.

mod context;
mod entity;
mod instance;
mod policy;
mod property;
mod provider;

pub use context::MappingContext;
pub use entity::EntityMetadata;
pub use instance::{DynamicEntity, EntityRef, LazyEntity, SemanticEntity};
pub use policy::{Cascade, FetchMode, MappingPolicy};
pub use property::{Direction, PropertyKind, PropertyMetadata};
pub use provider::{
    AssociationDescriptor, FieldDescriptor, StaticMetadataProvider, TypeDescriptor,
    TypeMetadataProvider,
};

use crate::codec::CodecError;
use crate::rdf::PrefixError;
use thiserror::Error;

/// Mapping errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    /// Literal could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Type not known to the metadata provider
    #[error("Unknown entity type: {0}")]
    UnknownType(String),

    /// Descriptor violates a metadata rule
    #[error("Invalid metadata for {type_name}: {reason}")]
    InvalidMetadata { type_name: String, reason: String },

    /// Predicate or type name could not be resolved to an IRI
    #[error("Name resolution failed: {0}")]
    Resolution(#[from] PrefixError),

    /// Entity has no usable resource id
    #[error("Entity of type {type_name} has no valid id: {reason}")]
    InvalidId { type_name: String, reason: String },

    /// Field does not exist on the entity
    #[error("Unknown field {field} on {type_name}")]
    UnknownField { type_name: String, field: String },

    /// Entity refused a value for a field
    #[error("Field {field} rejected value: {reason}")]
    FieldRejected { field: String, reason: String },

    /// Entity would be written without any property statements
    #[error("Entity {0} has no populated properties")]
    EmptyEntity(String),

    /// Lock of a shared entity or cache was poisoned
    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

pub type MappingResult<T> = Result<T, MappingError>;

impl MappingError {
    /// Shorthand for a field/type mismatch raised by `SemanticEntity::set_value`
    pub fn rejected(field: &str, expected: &str, value: &crate::codec::FieldValue) -> Self {
        MappingError::FieldRejected {
            field: field.to_string(),
            reason: format!("expected {}, got {}", expected, value.type_name()),
        }
    }
}
