//! Property metadata

use super::policy::MappingPolicy;
use super::provider::FieldDescriptor;
use super::{MappingError, MappingResult};
use crate::codec::ValueKind;
use crate::rdf::{NamedNode, NamespaceManager};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Orientation of association statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// (this, predicate, related)
    #[default]
    Outgoing,
    /// (related, predicate, this)
    Incoming,
    /// Both orientations
    Both,
}

impl Direction {
    pub fn is_outgoing(&self) -> bool {
        matches!(self, Direction::Outgoing | Direction::Both)
    }

    pub fn is_incoming(&self) -> bool {
        matches!(self, Direction::Incoming | Direction::Both)
    }
}

/// What a property maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// Resource id of the entity
    Id,
    /// Named graph holding the entity's statements
    Context,
    /// Link to other entities
    Association {
        direction: Direction,
        target_type: String,
        /// Name of the property on the target type mapping the same link
        mapped_property: Option<String>,
    },
    /// Literal-valued field
    Simple {
        datatype: Option<NamedNode>,
        languages: Vec<String>,
    },
}

/// Metadata of one mapped field
#[derive(Debug)]
pub struct PropertyMetadata {
    name: String,
    kind: PropertyKind,
    value_kind: ValueKind,
    collection: bool,
    declared_predicate: Option<String>,
    namespace: String,
    policy: MappingPolicy,
    namespaces: Arc<NamespaceManager>,
    predicate: OnceLock<NamedNode>,
}

impl PropertyMetadata {
    /// Build from a field descriptor; `namespace` is the owning entity's
    /// effective namespace.
    pub(crate) fn build(
        type_name: &str,
        field: &FieldDescriptor,
        namespace: &str,
        namespaces: Arc<NamespaceManager>,
    ) -> MappingResult<Self> {
        let invalid = |reason: String| MappingError::InvalidMetadata {
            type_name: type_name.to_string(),
            reason,
        };

        if field.id && field.association.is_some() {
            return Err(invalid(format!(
                "field {} cannot be both id and association",
                field.name
            )));
        }
        if field.id && field.context {
            return Err(invalid(format!(
                "field {} cannot be both id and context",
                field.name
            )));
        }

        let kind = if field.id {
            PropertyKind::Id
        } else if field.context {
            if field.kind != ValueKind::Iri {
                return Err(invalid(format!(
                    "context field {} must be of iri kind",
                    field.name
                )));
            }
            PropertyKind::Context
        } else if let Some(assoc) = &field.association {
            if assoc.target.is_empty() {
                return Err(invalid(format!(
                    "association {} has no target type",
                    field.name
                )));
            }
            PropertyKind::Association {
                direction: assoc.direction,
                target_type: assoc.target.clone(),
                mapped_property: assoc.mapped_by.clone(),
            }
        } else {
            let datatype = match &field.datatype {
                Some(dt) => Some(namespaces.resolve(dt, namespace)?),
                None => None,
            };
            PropertyKind::Simple {
                datatype,
                languages: field.languages.clone(),
            }
        };

        Ok(Self {
            name: field.name.clone(),
            kind,
            value_kind: field.kind,
            collection: field.collection,
            declared_predicate: field.predicate.clone(),
            namespace: namespace.to_string(),
            policy: field.policy(),
            namespaces,
            predicate: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Declared field type
    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }

    pub fn is_id(&self) -> bool {
        matches!(self.kind, PropertyKind::Id)
    }

    pub fn is_context(&self) -> bool {
        matches!(self.kind, PropertyKind::Context)
    }

    pub fn is_association(&self) -> bool {
        matches!(self.kind, PropertyKind::Association { .. })
    }

    /// Association direction; `None` for non-association properties
    pub fn direction(&self) -> Option<Direction> {
        match &self.kind {
            PropertyKind::Association { direction, .. } => Some(*direction),
            _ => None,
        }
    }

    pub fn target_type(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::Association { target_type, .. } => Some(target_type),
            _ => None,
        }
    }

    pub fn mapped_property(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::Association {
                mapped_property, ..
            } => mapped_property.as_deref(),
            _ => None,
        }
    }

    pub fn datatype(&self) -> Option<&NamedNode> {
        match &self.kind {
            PropertyKind::Simple { datatype, .. } => datatype.as_ref(),
            _ => None,
        }
    }

    /// Language preference order
    pub fn languages(&self) -> &[String] {
        match &self.kind {
            PropertyKind::Simple { languages, .. } => languages,
            _ => &[],
        }
    }

    /// Declared fetch/cascade policy
    pub fn policy(&self) -> &MappingPolicy {
        &self.policy
    }

    /// Predicate IRI, resolved on first use and cached.
    ///
    /// The declared predicate (or the field name when none is declared) is
    /// expanded if it is a prefixed name, used verbatim if absolute and
    /// otherwise appended to the owning entity's namespace.
    pub fn predicate(&self) -> MappingResult<&NamedNode> {
        if let Some(predicate) = self.predicate.get() {
            return Ok(predicate);
        }
        let name = self.declared_predicate.as_deref().unwrap_or(&self.name);
        let resolved = self.namespaces.resolve(name, &self.namespace)?;
        Ok(self.predicate.get_or_init(|| resolved))
    }
}
