//! Read path: statements to entity fields

use super::state::StateSnapshot;
use crate::codec::{FieldValue, ValueCodec, ValueKind};
use crate::error::SemanticResult;
use crate::mapping::{
    Cascade, EntityMetadata, EntityRef, LazyEntity, MappingContext, MappingPolicy,
    PropertyKind, PropertyMetadata,
};
use crate::rdf::{NamedNode, QuadPattern, RdfObject};
use crate::store::StoreConnection;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Copies stored statements into entity instances
pub struct EntityStateTransmitter<'a> {
    ctx: &'a MappingContext,
    conn: &'a dyn StoreConnection,
    refresh: bool,
}

impl<'a> EntityStateTransmitter<'a> {
    pub fn new(ctx: &'a MappingContext, conn: &'a dyn StoreConnection) -> Self {
        Self {
            ctx,
            conn,
            refresh: false,
        }
    }

    /// Treat associations cascading `REFRESH` as eager
    pub fn refreshing(mut self) -> Self {
        self.refresh = true;
        self
    }

    /// Statements about `id`: those it is the subject of, plus those pointing
    /// at it when the type maps incoming associations
    pub fn snapshot(&self, meta: &EntityMetadata, id: &NamedNode) -> SemanticResult<StateSnapshot> {
        let mut quads = self.conn.statements(&QuadPattern::subject(id.clone()))?;
        if meta.has_incoming_associations() {
            quads.extend(self.conn.statements(&QuadPattern::object(id.clone()))?);
        }
        Ok(StateSnapshot::for_resource(id.clone(), quads))
    }

    /// Load the entity stored under `id`, or `None` when no statement types
    /// the resource with the entity's class
    pub fn load(
        &self,
        meta: &Arc<EntityMetadata>,
        id: &NamedNode,
        policy: &MappingPolicy,
    ) -> SemanticResult<Option<EntityRef>> {
        let mut visited = HashMap::new();
        self.load_visited(meta, id, policy, &mut visited)
    }

    /// Re-populate an existing instance. Returns false when the resource is
    /// no longer stored.
    pub fn populate(
        &self,
        entity: &EntityRef,
        meta: &Arc<EntityMetadata>,
        id: &NamedNode,
        policy: &MappingPolicy,
    ) -> SemanticResult<bool> {
        let snapshot = self.snapshot(meta, id)?;
        if !snapshot.has_type(meta.rdf_type()) {
            return Ok(false);
        }
        let mut visited = HashMap::new();
        visited.insert(id.clone(), entity.clone());
        self.fill(entity, meta, &snapshot, policy, &mut visited)?;
        Ok(true)
    }

    fn load_visited(
        &self,
        meta: &Arc<EntityMetadata>,
        id: &NamedNode,
        policy: &MappingPolicy,
        visited: &mut HashMap<NamedNode, EntityRef>,
    ) -> SemanticResult<Option<EntityRef>> {
        if let Some(existing) = visited.get(id) {
            debug!("Reusing in-progress instance for {}", id);
            return Ok(Some(existing.clone()));
        }
        let snapshot = self.snapshot(meta, id)?;
        if !snapshot.has_type(meta.rdf_type()) {
            return Ok(None);
        }
        let entity = self.ctx.instantiate(meta.type_name())?;
        visited.insert(id.clone(), entity.clone());
        self.fill(&entity, meta, &snapshot, policy, visited)?;
        Ok(Some(entity))
    }

    fn fill(
        &self,
        entity: &EntityRef,
        meta: &Arc<EntityMetadata>,
        snapshot: &StateSnapshot,
        policy: &MappingPolicy,
        visited: &mut HashMap<NamedNode, EntityRef>,
    ) -> SemanticResult<()> {
        let id = snapshot.resource();
        entity.set(meta.id_property().name(), id.clone())?;

        // Context first; the other properties are read from that graph only
        let mut context = None;
        if let Some(property) = meta.context_property() {
            let predicate = property.predicate()?;
            context = snapshot
                .objects(predicate, None)
                .find_map(|o| o.as_named_node())
                .or_else(|| snapshot.type_context(meta.rdf_type()))
                .cloned();
            entity.set(property.name(), FieldValue::from(context.clone()))?;
        }

        for property in meta.properties() {
            let value = match property.kind() {
                PropertyKind::Id | PropertyKind::Context => continue,
                PropertyKind::Simple { .. } => {
                    self.read_simple(property, snapshot, context.as_ref())?
                }
                PropertyKind::Association { .. } => {
                    self.read_association(property, snapshot, context.as_ref(), policy, visited)?
                }
            };
            entity.set(property.name(), value)?;
        }
        Ok(())
    }

    fn read_simple(
        &self,
        property: &PropertyMetadata,
        snapshot: &StateSnapshot,
        context: Option<&NamedNode>,
    ) -> SemanticResult<FieldValue> {
        let predicate = property.predicate()?;
        let objects: Vec<&RdfObject> = snapshot.objects(predicate, context).collect();
        let decode = |object: &RdfObject| {
            ValueCodec::decode(object, property.value_kind(), property.datatype())
        };

        if property.is_collection() {
            let values = objects
                .into_iter()
                .filter(|o| language_accepted(o, property.languages()))
                .map(|o| decode(o))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(FieldValue::List(values));
        }

        match select_by_language(&objects, property.languages()) {
            Some(object) => Ok(decode(object)?),
            None => Ok(FieldValue::Null),
        }
    }

    fn read_association(
        &self,
        property: &PropertyMetadata,
        snapshot: &StateSnapshot,
        context: Option<&NamedNode>,
        policy: &MappingPolicy,
        visited: &mut HashMap<NamedNode, EntityRef>,
    ) -> SemanticResult<FieldValue> {
        let (direction, target) = match property.kind() {
            PropertyKind::Association {
                direction,
                target_type,
                ..
            } => (*direction, target_type.as_str()),
            _ => return Ok(FieldValue::Null),
        };

        let mut related: IndexSet<NamedNode> = IndexSet::new();
        if direction.is_outgoing() {
            let predicate = property.predicate()?;
            related.extend(
                snapshot
                    .objects(predicate, context)
                    .filter_map(|o| o.as_named_node())
                    .cloned(),
            );
        }
        if direction.is_incoming() {
            let inverse = self.ctx.inverse_property(property)?;
            let predicate = match &inverse {
                Some(inv) => inv.predicate()?,
                None => property.predicate()?,
            };
            related.extend(snapshot.subjects(predicate, context).cloned());
        }

        let effective = policy.combine_with(property.policy());
        let eager = effective.is_eager()
            || (self.refresh && effective.should_cascade(Cascade::Refresh));

        let mut values = Vec::with_capacity(related.len());
        for id in related {
            let value = if property.value_kind() == ValueKind::Iri {
                FieldValue::Iri(id)
            } else if eager {
                let target_meta = self.ctx.metadata(target)?;
                match self.load_visited(&target_meta, &id, &effective, visited)? {
                    Some(entity) => FieldValue::Entity(entity),
                    None => FieldValue::Iri(id),
                }
            } else {
                FieldValue::Lazy(LazyEntity::new(id, target))
            };
            values.push(value);
        }

        if property.is_collection() {
            Ok(FieldValue::List(values))
        } else {
            Ok(values.into_iter().next().unwrap_or_default())
        }
    }
}

fn literal_language(object: &RdfObject) -> Option<&str> {
    object.as_literal().and_then(|l| l.language())
}

fn language_accepted(object: &RdfObject, languages: &[String]) -> bool {
    match literal_language(object) {
        Some(lang) if !languages.is_empty() => {
            languages.iter().any(|l| l.eq_ignore_ascii_case(lang))
        }
        _ => true,
    }
}

/// Preferred language first, in declaration order, then the first untagged
/// value. Without declared languages the first value wins.
fn select_by_language<'o>(objects: &[&'o RdfObject], languages: &[String]) -> Option<&'o RdfObject> {
    if languages.is_empty() {
        return objects.first().copied();
    }
    for language in languages {
        let found = objects.iter().find(|o| {
            literal_language(o).map_or(false, |l| l.eq_ignore_ascii_case(language))
        });
        if let Some(object) = found {
            return Some(*object);
        }
    }
    objects
        .iter()
        .find(|o| literal_language(o).is_none())
        .copied()
}
