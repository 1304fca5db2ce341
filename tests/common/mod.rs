#![allow(dead_code)]

use samyama_ogm::{
    Cascade, Direction, DynamicEntity, EntityRef, FieldDescriptor, FieldValue, MappingConfig,
    MappingError, MappingResult, MemoryStore, NamedNode, SemanticEntity, SemanticTemplate,
    StaticMetadataProvider, TypeDescriptor, ValueKind,
};
use std::sync::Arc;

pub const NS: &str = "http://example.org/wine#";

pub fn iri(local: &str) -> NamedNode {
    NamedNode::new(format!("{}{}", NS, local)).unwrap()
}

/// Wines, wineries, self-linked chains and graph-scoped notes
pub fn provider() -> StaticMetadataProvider {
    let mut provider = StaticMetadataProvider::new();
    provider
        .register_dynamic(
            TypeDescriptor::new("Winery")
                .with_namespace(NS)
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
                .with_namespace(NS)
                .field(FieldDescriptor::id_field("uri"))
                .field(FieldDescriptor::simple("name", ValueKind::String).with_languages(["en", "fr"]))
                .field(FieldDescriptor::simple("vintage", ValueKind::Calendar))
                .field(FieldDescriptor::simple("price", ValueKind::Float))
                .field(FieldDescriptor::simple("cellarNote", ValueKind::String).transient())
                .field(FieldDescriptor::association("maker", "Winery").with_cascade([Cascade::Save])),
        )
        .register_dynamic(
            TypeDescriptor::new("Part")
                .with_namespace(NS)
                .field(FieldDescriptor::id_field("uri"))
                .field(FieldDescriptor::simple("label", ValueKind::String))
                .field(FieldDescriptor::association("next", "Part").with_cascade([Cascade::All])),
        )
        .register_dynamic(
            TypeDescriptor::new("Loose")
                .with_namespace(NS)
                .field(FieldDescriptor::id_field("uri"))
                .field(FieldDescriptor::simple("label", ValueKind::String))
                .field(FieldDescriptor::association("next", "Loose")),
        )
        .register_dynamic(
            TypeDescriptor::new("Person")
                .with_namespace(NS)
                .field(FieldDescriptor::id_field("uri"))
                .field(FieldDescriptor::simple("name", ValueKind::String))
                .field(FieldDescriptor::association("friend", "Person").with_cascade([Cascade::Save]))
                .field(
                    FieldDescriptor::association("knows", "Person")
                        .with_direction(Direction::Both)
                        .collection(),
                ),
        )
        .register_dynamic(
            TypeDescriptor::new("Note")
                .with_namespace(NS)
                .field(FieldDescriptor::id_field("uri"))
                .field(FieldDescriptor::context_field("graph"))
                .field(FieldDescriptor::simple("text", ValueKind::String)),
        )
        .register(
            TypeDescriptor::new("Bottle")
                .with_namespace(NS)
                .field(FieldDescriptor::id_field("uri"))
                .field(FieldDescriptor::simple("label", ValueKind::String))
                .field(FieldDescriptor::simple("volume", ValueKind::Integer)),
            || EntityRef::new(Bottle::default()),
        );
    provider
}

/// Statically typed entity; values that do not fit its fields are refused
#[derive(Debug, Default)]
pub struct Bottle {
    pub uri: Option<NamedNode>,
    pub label: Option<String>,
    pub volume_ml: Option<u32>,
}

impl Bottle {
    pub fn new(local: &str, label: &str, volume_ml: u32) -> EntityRef {
        EntityRef::new(Bottle {
            uri: Some(iri(local)),
            label: Some(label.to_string()),
            volume_ml: Some(volume_ml),
        })
    }
}

fn rejected(field: &str, value: &FieldValue) -> MappingError {
    MappingError::FieldRejected {
        field: field.to_string(),
        reason: format!("{} does not fit", value.type_name()),
    }
}

impl SemanticEntity for Bottle {
    fn type_name(&self) -> &str {
        "Bottle"
    }

    fn get_value(&self, field: &str) -> FieldValue {
        match field {
            "uri" => self.uri.clone().into(),
            "label" => self.label.clone().into(),
            "volume" => self.volume_ml.map(i64::from).into(),
            _ => FieldValue::Null,
        }
    }

    fn set_value(&mut self, field: &str, value: FieldValue) -> MappingResult<()> {
        match (field, &value) {
            ("uri", FieldValue::Null) => self.uri = None,
            ("uri", FieldValue::Iri(node)) => self.uri = Some(node.clone()),
            ("label", FieldValue::Null) => self.label = None,
            ("label", v) if v.as_str().is_some() => self.label = v.as_str().map(str::to_string),
            ("volume", FieldValue::Null) => self.volume_ml = None,
            ("volume", FieldValue::Integer(i)) => {
                self.volume_ml = Some(u32::try_from(*i).map_err(|_| rejected(field, &value))?)
            }
            ("uri" | "label" | "volume", _) => return Err(rejected(field, &value)),
            _ => {
                return Err(MappingError::UnknownField {
                    type_name: "Bottle".to_string(),
                    field: field.to_string(),
                })
            }
        }
        Ok(())
    }
}

pub fn template() -> (Arc<MemoryStore>, SemanticTemplate) {
    template_with(MappingConfig::default())
}

pub fn template_with(config: MappingConfig) -> (Arc<MemoryStore>, SemanticTemplate) {
    let store = Arc::new(MemoryStore::new());
    let template = SemanticTemplate::new(store.clone(), Arc::new(provider()), config).unwrap();
    (store, template)
}

pub fn entity(type_name: &str, local: &str) -> EntityRef {
    EntityRef::new(DynamicEntity::new(type_name).with("uri", iri(local)))
}

pub fn wine(local: &str, name: &str) -> EntityRef {
    EntityRef::new(
        DynamicEntity::new("Wine")
            .with("uri", iri(local))
            .with("name", name),
    )
}
