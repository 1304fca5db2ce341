//! Entity metadata

use super::property::{PropertyKind, PropertyMetadata};
use super::provider::TypeDescriptor;
use super::{MappingError, MappingResult};
use crate::rdf::{NamedNode, NamespaceManager};
use std::sync::Arc;

/// Immutable per-type mapping descriptor, shared by every instance of the type
#[derive(Debug)]
pub struct EntityMetadata {
    type_name: String,
    rdf_type: NamedNode,
    namespace: String,
    id_property: Arc<PropertyMetadata>,
    context_property: Option<Arc<PropertyMetadata>>,
    properties: Vec<Arc<PropertyMetadata>>,
}

impl EntityMetadata {
    /// Build metadata from a descriptor.
    ///
    /// Transient fields are dropped here, so neither traversal ever sees them.
    /// `default_namespace` applies when the descriptor declares no namespace.
    pub fn build(
        descriptor: &TypeDescriptor,
        default_namespace: &str,
        namespaces: Arc<NamespaceManager>,
    ) -> MappingResult<Self> {
        let type_name = descriptor.name.as_str();
        let invalid = |reason: &str| MappingError::InvalidMetadata {
            type_name: type_name.to_string(),
            reason: reason.to_string(),
        };

        let namespace = descriptor
            .namespace
            .clone()
            .unwrap_or_else(|| default_namespace.to_string());

        let mut properties = Vec::new();
        let mut id_property = None;
        let mut context_property = None;

        for field in descriptor.fields.iter().filter(|f| !f.transient) {
            let property = Arc::new(PropertyMetadata::build(
                type_name,
                field,
                &namespace,
                Arc::clone(&namespaces),
            )?);
            match property.kind() {
                PropertyKind::Id => {
                    if id_property.is_some() {
                        return Err(invalid("more than one id property"));
                    }
                    id_property = Some(Arc::clone(&property));
                }
                PropertyKind::Context => {
                    if context_property.is_some() {
                        return Err(invalid("more than one context property"));
                    }
                    context_property = Some(Arc::clone(&property));
                }
                _ => {}
            }
            properties.push(property);
        }

        let id_property = id_property.ok_or_else(|| invalid("no id property"))?;

        let rdf_type_name = descriptor.rdf_type.as_deref().unwrap_or(type_name);
        let rdf_type = namespaces.resolve(rdf_type_name, &namespace)?;

        Ok(Self {
            type_name: type_name.to_string(),
            rdf_type,
            namespace,
            id_property,
            context_property,
            properties,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// RDF class of the entity
    pub fn rdf_type(&self) -> &NamedNode {
        &self.rdf_type
    }

    /// Namespace used for relative names
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn id_property(&self) -> &Arc<PropertyMetadata> {
        &self.id_property
    }

    pub fn context_property(&self) -> Option<&Arc<PropertyMetadata>> {
        self.context_property.as_ref()
    }

    /// Every mapped property in declaration order
    pub fn properties(&self) -> &[Arc<PropertyMetadata>] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Arc<PropertyMetadata>> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Literal-valued properties
    pub fn simple_properties(&self) -> impl Iterator<Item = &Arc<PropertyMetadata>> {
        self.properties
            .iter()
            .filter(|p| matches!(p.kind(), PropertyKind::Simple { .. }))
    }

    pub fn associations(&self) -> impl Iterator<Item = &Arc<PropertyMetadata>> {
        self.properties.iter().filter(|p| p.is_association())
    }

    /// True when some association is stored as statements pointing at this entity
    pub fn has_incoming_associations(&self) -> bool {
        self.associations()
            .any(|p| p.direction().map_or(false, |d| d.is_incoming()))
    }
}
