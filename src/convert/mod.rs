//! Conversion between entity instances and statements
//!
//! - [`state`]: add/delete accumulators and read snapshots
//! - [`transmitter`]: the read path
//! - [`handlers`]: the create, update and delete traversals

pub mod handlers;
pub mod state;
pub mod transmitter;

pub use handlers::{
    stored_owned_statements, CreateHandler, DeleteHandler, EntityWriter, StatementsHandler,
    UpdateHandler,
};
pub use state::{RdfDiff, RdfState, StateSnapshot};
pub use transmitter::EntityStateTransmitter;

use crate::codec::FieldValue;
use crate::error::SemanticResult;
use crate::mapping::{EntityMetadata, EntityRef, MappingContext, MappingError};
use crate::rdf::NamedNode;

/// Resource id held by the entity's id property
pub fn resource_id(
    ctx: &MappingContext,
    meta: &EntityMetadata,
    entity: &EntityRef,
) -> SemanticResult<NamedNode> {
    let value = entity.get(meta.id_property().name())?;
    reference(ctx, meta, &value)?.ok_or_else(|| {
        MappingError::InvalidId {
            type_name: meta.type_name().to_string(),
            reason: "id is not set".to_string(),
        }
        .into()
    })
}

/// Resource named by a field value. Strings are resolved against the type's
/// namespace.
pub(crate) fn reference(
    ctx: &MappingContext,
    meta: &EntityMetadata,
    value: &FieldValue,
) -> SemanticResult<Option<NamedNode>> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Iri(node) => Ok(Some(node.clone())),
        FieldValue::String(name) if !name.is_empty() => {
            let node = ctx
                .namespaces()
                .resolve(name, meta.namespace())
                .map_err(MappingError::from)?;
            Ok(Some(node))
        }
        other => Err(MappingError::InvalidId {
            type_name: meta.type_name().to_string(),
            reason: format!("{} is not a resource reference", other.type_name()),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ValueKind;
    use crate::mapping::{DynamicEntity, FieldDescriptor, StaticMetadataProvider, TypeDescriptor};
    use crate::rdf::NamespaceManager;
    use std::sync::Arc;

    fn context() -> MappingContext {
        let mut provider = StaticMetadataProvider::new();
        provider.register_dynamic(
            TypeDescriptor::new("Wine")
                .with_namespace("http://example.org/wine#")
                .field(FieldDescriptor::id_field("uri"))
                .field(FieldDescriptor::simple("name", ValueKind::String)),
        );
        MappingContext::new(Arc::new(provider), NamespaceManager::new(), "urn:test:")
    }

    #[test]
    fn test_resource_id() {
        let ctx = context();
        let meta = ctx.metadata("Wine").unwrap();

        let wine = EntityRef::new(
            DynamicEntity::new("Wine").with("uri", NamedNode::new("urn:wine:1").unwrap()),
        );
        assert_eq!(resource_id(&ctx, &meta, &wine).unwrap().as_str(), "urn:wine:1");

        let relative = EntityRef::new(DynamicEntity::new("Wine").with("uri", "merlot"));
        assert_eq!(
            resource_id(&ctx, &meta, &relative).unwrap().as_str(),
            "http://example.org/wine#merlot"
        );

        let missing = EntityRef::new(DynamicEntity::new("Wine"));
        assert!(resource_id(&ctx, &meta, &missing).is_err());

        let wrong = EntityRef::new(DynamicEntity::new("Wine").with("uri", 7i64));
        assert!(resource_id(&ctx, &meta, &wrong).is_err());
    }
}
