//! Entity instances
//!
//! Entities are reached through [`SemanticEntity`] instead of reflection. They
//! are shared as [`EntityRef`] handles so that cyclic object graphs can be
//! expressed, and a [`LazyEntity`] stands in for an association that is loaded
//! on first access.

use super::{MappingError, MappingResult};
use crate::codec::FieldValue;
use crate::rdf::NamedNode;
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Field access for mapped entities
pub trait SemanticEntity: Send + Sync {
    /// Name of the entity type, as registered with the metadata provider
    fn type_name(&self) -> &str;

    /// Current value of a field; `FieldValue::Null` when unset or unknown
    fn get_value(&self, field: &str) -> FieldValue;

    /// Assign a decoded value. Implementations reject values that do not fit
    /// the field's declared type.
    fn set_value(&mut self, field: &str, value: FieldValue) -> MappingResult<()>;
}

/// Shared handle to an entity instance
#[derive(Clone)]
pub struct EntityRef(Arc<RwLock<dyn SemanticEntity>>);

impl EntityRef {
    pub fn new<E: SemanticEntity + 'static>(entity: E) -> Self {
        Self(Arc::new(RwLock::new(entity)))
    }

    /// Borrow the entity for reading
    pub fn read(&self) -> MappingResult<RwLockReadGuard<'_, dyn SemanticEntity + 'static>> {
        self.0
            .read()
            .map_err(|e| MappingError::Poisoned(e.to_string()))
    }

    /// Borrow the entity for writing
    pub fn write(&self) -> MappingResult<RwLockWriteGuard<'_, dyn SemanticEntity + 'static>> {
        self.0
            .write()
            .map_err(|e| MappingError::Poisoned(e.to_string()))
    }

    pub fn type_name(&self) -> MappingResult<String> {
        Ok(self.read()?.type_name().to_string())
    }

    pub fn get(&self, field: &str) -> MappingResult<FieldValue> {
        Ok(self.read()?.get_value(field))
    }

    pub fn set(&self, field: &str, value: impl Into<FieldValue>) -> MappingResult<()> {
        self.write()?.set_value(field, value.into())
    }

    /// True when both handles point at the same instance
    pub fn ptr_eq(&self, other: &EntityRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Ok(entity) => write!(f, "EntityRef({})", entity.type_name()),
            Err(_) => f.write_str("EntityRef(<locked>)"),
        }
    }
}

/// Association loaded on first access
#[derive(Clone)]
pub struct LazyEntity {
    id: NamedNode,
    type_name: String,
    resolved: Arc<OnceLock<EntityRef>>,
}

impl LazyEntity {
    pub fn new(id: NamedNode, type_name: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            resolved: Arc::new(OnceLock::new()),
        }
    }

    /// Resource id of the related entity
    pub fn id(&self) -> &NamedNode {
        &self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The loaded entity, if resolution already happened
    pub fn get(&self) -> Option<&EntityRef> {
        self.resolved.get()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Store the loaded entity; the first resolution wins
    pub(crate) fn fill(&self, entity: EntityRef) -> EntityRef {
        self.resolved.get_or_init(|| entity).clone()
    }
}

impl fmt::Debug for LazyEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyEntity")
            .field("id", &self.id.as_str())
            .field("type_name", &self.type_name)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Untyped entity record, used for types registered without a Rust struct
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicEntity {
    type_name: String,
    values: IndexMap<String, FieldValue>,
}

impl DynamicEntity {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            values: IndexMap::new(),
        }
    }

    /// Builder-style field assignment
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Populated fields in assignment order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl SemanticEntity for DynamicEntity {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get_value(&self, field: &str) -> FieldValue {
        self.values.get(field).cloned().unwrap_or_default()
    }

    fn set_value(&mut self, field: &str, value: FieldValue) -> MappingResult<()> {
        if value.is_null() {
            self.values.shift_remove(field);
        } else {
            self.values.insert(field.to_string(), value);
        }
        Ok(())
    }
}
