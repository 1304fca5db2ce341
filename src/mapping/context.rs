//! Process-wide metadata cache

use super::entity::EntityMetadata;
use super::instance::EntityRef;
use super::property::PropertyMetadata;
use super::provider::TypeMetadataProvider;
use super::{MappingError, MappingResult};
use crate::rdf::NamespaceManager;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Metadata cache and type registry shared by all mapping operations
///
/// Metadata is built on first access and never changes afterwards. Two callers
/// racing on the same type may both build it; the first descriptor inserted
/// is kept and handed to both.
pub struct MappingContext {
    provider: Arc<dyn TypeMetadataProvider>,
    namespaces: Arc<NamespaceManager>,
    default_namespace: String,
    cache: RwLock<HashMap<String, Arc<EntityMetadata>>>,
}

impl MappingContext {
    pub fn new(
        provider: Arc<dyn TypeMetadataProvider>,
        namespaces: NamespaceManager,
        default_namespace: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            namespaces: Arc::new(namespaces),
            default_namespace: default_namespace.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Namespace for relative names of types that declare none
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    pub fn namespaces(&self) -> &NamespaceManager {
        &self.namespaces
    }

    pub fn provider(&self) -> &Arc<dyn TypeMetadataProvider> {
        &self.provider
    }

    /// Metadata of a type, building it on first access
    pub fn metadata(&self, type_name: &str) -> MappingResult<Arc<EntityMetadata>> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|e| MappingError::Poisoned(e.to_string()))?;
            if let Some(meta) = cache.get(type_name) {
                return Ok(Arc::clone(meta));
            }
        }

        // Built outside the lock; a concurrent builder may win the insert
        let descriptor = self
            .provider
            .descriptor(type_name)
            .ok_or_else(|| MappingError::UnknownType(type_name.to_string()))?;
        let built = Arc::new(EntityMetadata::build(
            &descriptor,
            &self.default_namespace,
            Arc::clone(&self.namespaces),
        )?);

        let mut cache = self
            .cache
            .write()
            .map_err(|e| MappingError::Poisoned(e.to_string()))?;
        let meta = cache
            .entry(type_name.to_string())
            .or_insert_with(|| {
                debug!("Built mapping metadata for {}", type_name);
                built
            });
        Ok(Arc::clone(meta))
    }

    /// Metadata of the entity's runtime type
    pub fn metadata_for(&self, entity: &EntityRef) -> MappingResult<Arc<EntityMetadata>> {
        let type_name = entity.type_name()?;
        self.metadata(&type_name)
    }

    /// Fresh instance of a type
    pub fn instantiate(&self, type_name: &str) -> MappingResult<EntityRef> {
        self.provider
            .instantiate(type_name)
            .ok_or_else(|| MappingError::UnknownType(type_name.to_string()))
    }

    /// Property on the related type that maps the other side of an association.
    ///
    /// Absent when the association declares no mapped property, or when the
    /// related type is not registered or has no such property. Metadata of a
    /// registered related type that fails to build is an error.
    pub fn inverse_property(
        &self,
        property: &PropertyMetadata,
    ) -> MappingResult<Option<Arc<PropertyMetadata>>> {
        let (Some(target), Some(mapped)) = (property.target_type(), property.mapped_property())
        else {
            return Ok(None);
        };
        match self.metadata(target) {
            Ok(meta) => Ok(meta.property(mapped).cloned()),
            Err(MappingError::UnknownType(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Number of types with built metadata
    pub fn cached_types(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ValueKind;
    use crate::mapping::{Direction, FieldDescriptor, StaticMetadataProvider, TypeDescriptor};
    use std::thread;

    fn context() -> MappingContext {
        let mut provider = StaticMetadataProvider::new();
        provider
            .register_dynamic(
                TypeDescriptor::new("Winery")
                    .field(FieldDescriptor::id_field("uri"))
                    .field(FieldDescriptor::simple("name", ValueKind::String))
                    .field(
                        FieldDescriptor::association("wines", "Wine")
                            .with_direction(Direction::Incoming)
                            .mapped_by("maker")
                            .collection(),
                    ),
            )
            .register_dynamic(
                TypeDescriptor::new("Wine")
                    .field(FieldDescriptor::id_field("uri"))
                    .field(FieldDescriptor::association("maker", "Winery"))
                    .field(FieldDescriptor::association("pairing", "Dish"))
                    .field(
                        FieldDescriptor::association("racks", "Rack")
                            .with_direction(Direction::Incoming)
                            .mapped_by("holds")
                            .collection(),
                    ),
            )
            // No id property: its metadata never builds
            .register_dynamic(
                TypeDescriptor::new("Rack")
                    .field(FieldDescriptor::association("holds", "Wine")),
            );
        MappingContext::new(
            Arc::new(provider),
            NamespaceManager::new(),
            "urn:test:namespace:",
        )
    }

    #[test]
    fn test_metadata_is_cached() {
        let ctx = context();
        let first = ctx.metadata("Wine").unwrap();
        let second = ctx.metadata("Wine").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.cached_types(), 1);
    }

    #[test]
    fn test_unknown_type() {
        let ctx = context();
        assert!(matches!(
            ctx.metadata("Beer"),
            Err(MappingError::UnknownType(_))
        ));
        assert!(ctx.instantiate("Beer").is_err());
    }

    #[test]
    fn test_concurrent_first_access_converges() {
        let ctx = Arc::new(context());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || ctx.metadata("Winery").unwrap())
            })
            .collect();
        let metas: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for meta in &metas {
            assert!(Arc::ptr_eq(meta, &metas[0]));
        }
    }

    #[test]
    fn test_inverse_property() {
        let ctx = context();
        let winery = ctx.metadata("Winery").unwrap();
        let wines = winery.property("wines").unwrap();
        let inverse = ctx.inverse_property(wines).unwrap().unwrap();
        assert_eq!(inverse.name(), "maker");

        // No mapped property, and an unknown target: both absent, not errors
        let wine = ctx.metadata("Wine").unwrap();
        assert!(ctx.inverse_property(wine.property("maker").unwrap()).unwrap().is_none());
        assert!(ctx.inverse_property(wine.property("pairing").unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_inverse_property_reports_broken_target() {
        let ctx = context();
        let wine = ctx.metadata("Wine").unwrap();
        assert!(matches!(
            ctx.inverse_property(wine.property("racks").unwrap()),
            Err(MappingError::InvalidMetadata { .. })
        ));
    }
}
