//! Type metadata provider
//!
//! The provider hands out per-type descriptors with their field annotations
//! already attached, and constructs empty instances for the read path. It does
//! not scan or reflect; descriptors are registered up front, in code or from a
//! YAML/JSON document.

use super::instance::{DynamicEntity, EntityRef};
use super::policy::{Cascade, FetchMode, MappingPolicy};
use super::property::Direction;
use crate::codec::ValueKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Association annotation of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDescriptor {
    /// Type name of the related entity
    pub target: String,
    #[serde(default)]
    pub direction: Direction,
    /// Field of the related type that maps the other side of the link
    #[serde(default)]
    pub mapped_by: Option<String>,
}

/// Annotations of a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: ValueKind,
    /// Predicate override: absolute IRI, prefixed name or relative name
    #[serde(default)]
    pub predicate: Option<String>,
    #[serde(default)]
    pub id: bool,
    #[serde(default)]
    pub context: bool,
    #[serde(default)]
    pub transient: bool,
    #[serde(default)]
    pub collection: bool,
    #[serde(default)]
    pub datatype: Option<String>,
    /// Language preference order
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub association: Option<AssociationDescriptor>,
    #[serde(default)]
    pub fetch: Option<FetchMode>,
    #[serde(default)]
    pub cascade: Option<Vec<Cascade>>,
}

impl FieldDescriptor {
    /// Plain literal-valued field
    pub fn simple(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            predicate: None,
            id: false,
            context: false,
            transient: false,
            collection: false,
            datatype: None,
            languages: Vec::new(),
            association: None,
            fetch: None,
            cascade: None,
        }
    }

    /// Identifying field holding the resource IRI
    pub fn id_field(name: impl Into<String>) -> Self {
        Self {
            id: true,
            ..Self::simple(name, ValueKind::Iri)
        }
    }

    /// Field holding the named graph of the entity
    pub fn context_field(name: impl Into<String>) -> Self {
        Self {
            context: true,
            ..Self::simple(name, ValueKind::Iri)
        }
    }

    /// Field referencing entities of type `target`
    pub fn association(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            association: Some(AssociationDescriptor {
                target: target.into(),
                direction: Direction::Outgoing,
                mapped_by: None,
            }),
            ..Self::simple(name, ValueKind::Entity)
        }
    }

    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = Some(datatype.into());
        self
    }

    pub fn with_languages<S: Into<String>>(mut self, languages: impl IntoIterator<Item = S>) -> Self {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        if let Some(assoc) = self.association.as_mut() {
            assoc.direction = direction;
        }
        self
    }

    pub fn mapped_by(mut self, field: impl Into<String>) -> Self {
        if let Some(assoc) = self.association.as_mut() {
            assoc.mapped_by = Some(field.into());
        }
        self
    }

    pub fn with_fetch(mut self, fetch: FetchMode) -> Self {
        self.fetch = Some(fetch);
        self
    }

    pub fn with_cascade(mut self, cascade: impl IntoIterator<Item = Cascade>) -> Self {
        self.cascade = Some(cascade.into_iter().collect());
        self
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    /// Declared fetch/cascade annotations as a policy
    pub fn policy(&self) -> MappingPolicy {
        let mut policy = MappingPolicy::new();
        if let Some(fetch) = self.fetch {
            policy = policy.with_fetch(fetch);
        }
        if let Some(cascade) = &self.cascade {
            policy = policy.with_cascade(cascade.iter().copied());
        }
        policy
    }
}

/// Annotations of an entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    /// RDF type override: absolute IRI, prefixed name or relative name
    #[serde(default)]
    pub rdf_type: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rdf_type: None,
            namespace: None,
            fields: Vec::new(),
        }
    }

    pub fn with_rdf_type(mut self, rdf_type: impl Into<String>) -> Self {
        self.rdf_type = Some(rdf_type.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// Source of type descriptors and instances
pub trait TypeMetadataProvider: Send + Sync {
    /// Descriptor of a type, if the type is known
    fn descriptor(&self, type_name: &str) -> Option<TypeDescriptor>;

    /// New empty instance of a type
    fn instantiate(&self, type_name: &str) -> Option<EntityRef>;

    /// Every known type name
    fn type_names(&self) -> Vec<String>;
}

type Factory = Arc<dyn Fn() -> EntityRef + Send + Sync>;

/// Registry-backed metadata provider
#[derive(Default)]
pub struct StaticMetadataProvider {
    types: IndexMap<String, (TypeDescriptor, Factory)>,
}

#[derive(Deserialize)]
struct DescriptorDocument {
    types: Vec<TypeDescriptor>,
}

impl StaticMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type together with the constructor of its instances
    pub fn register<F>(&mut self, descriptor: TypeDescriptor, factory: F) -> &mut Self
    where
        F: Fn() -> EntityRef + Send + Sync + 'static,
    {
        self.types
            .insert(descriptor.name.clone(), (descriptor, Arc::new(factory)));
        self
    }

    /// Register a type whose instances are `DynamicEntity` records
    pub fn register_dynamic(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        let name = descriptor.name.clone();
        self.register(descriptor, move || {
            EntityRef::new(DynamicEntity::new(name.clone()))
        })
    }

    /// Load dynamic types from a YAML document with a top-level `types` list
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let doc: DescriptorDocument = serde_yaml::from_str(yaml)?;
        Ok(Self::from_descriptors(doc.types))
    }

    /// Load dynamic types from a JSON document with a top-level `types` list
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let doc: DescriptorDocument = serde_json::from_str(json)?;
        Ok(Self::from_descriptors(doc.types))
    }

    fn from_descriptors(descriptors: Vec<TypeDescriptor>) -> Self {
        let mut provider = Self::new();
        for descriptor in descriptors {
            provider.register_dynamic(descriptor);
        }
        provider
    }
}

impl TypeMetadataProvider for StaticMetadataProvider {
    fn descriptor(&self, type_name: &str) -> Option<TypeDescriptor> {
        self.types.get(type_name).map(|(d, _)| d.clone())
    }

    fn instantiate(&self, type_name: &str) -> Option<EntityRef> {
        self.types.get(type_name).map(|(_, factory)| factory())
    }

    fn type_names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let field = FieldDescriptor::association("winery", "Winery")
            .with_direction(Direction::Incoming)
            .mapped_by("wines")
            .with_cascade([Cascade::Save]);
        let assoc = field.association.as_ref().unwrap();
        assert_eq!(assoc.target, "Winery");
        assert_eq!(assoc.direction, Direction::Incoming);
        assert_eq!(assoc.mapped_by.as_deref(), Some("wines"));
        assert!(field.policy().should_cascade(Cascade::Save));
        assert_eq!(field.kind, ValueKind::Entity);
    }

    #[test]
    fn test_register_and_instantiate() {
        let mut provider = StaticMetadataProvider::new();
        provider.register_dynamic(
            TypeDescriptor::new("Wine").field(FieldDescriptor::id_field("uri")),
        );

        assert!(provider.descriptor("Wine").is_some());
        assert!(provider.descriptor("Beer").is_none());
        let instance = provider.instantiate("Wine").unwrap();
        assert_eq!(instance.type_name().unwrap(), "Wine");
        assert_eq!(provider.type_names(), vec!["Wine".to_string()]);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
types:
  - name: Wine
    namespace: "http://example.org/wine#"
    fields:
      - name: uri
        kind: iri
        id: true
      - name: name
        languages: [en, fr]
      - name: year
        kind: calendar
      - name: maker
        association:
          target: Winery
          direction: both
        fetch: eager
        cascade: [save, delete]
"#;
        let provider = StaticMetadataProvider::from_yaml_str(yaml).unwrap();
        let wine = provider.descriptor("Wine").unwrap();
        assert_eq!(wine.fields.len(), 4);
        assert!(wine.fields[0].id);
        assert_eq!(wine.fields[1].kind, ValueKind::String);
        assert_eq!(wine.fields[1].languages, vec!["en", "fr"]);
        let maker = &wine.fields[3];
        assert_eq!(maker.association.as_ref().unwrap().direction, Direction::Both);
        assert!(maker.policy().is_eager());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"types": [{"name": "Tag", "fields": [{"name": "id", "kind": "iri", "id": true}]}]}"#;
        let provider = StaticMetadataProvider::from_json_str(json).unwrap();
        assert!(provider.instantiate("Tag").is_some());
        assert!(StaticMetadataProvider::from_json_str("{").is_err());
    }
}
