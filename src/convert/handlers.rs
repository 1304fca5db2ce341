//! Write path: entity graphs to statement diffs
//!
//! An [`EntityWriter`] walks an entity and its associations and records
//! statements into one [`RdfState`]. What "record" means (add or delete), which
//! cascade applies and what happens to previously stored statements is
//! decided by the [`StatementsHandler`].

use super::state::{RdfDiff, RdfState};
use super::{reference, resource_id};
use crate::codec::{FieldValue, ValueCodec};
use crate::error::SemanticResult;
use crate::mapping::{
    Cascade, EntityMetadata, EntityRef, MappingContext, MappingError, MappingPolicy,
    PropertyKind, PropertyMetadata,
};
use crate::rdf::{rdf_type, NamedNode, Quad, QuadPattern};
use crate::store::StoreConnection;
use std::collections::HashSet;
use tracing::debug;

/// Per-operation behaviour of the write traversal
pub trait StatementsHandler {
    /// Cascade that makes the traversal descend into related entities
    fn cascade_type(&self) -> Cascade;

    /// Accept entities that produce no property statement
    fn allow_empty(&self) -> bool;

    /// Emit the `(id, contextPredicate, graph)` assignment
    fn emit_context_assignment(&self) -> bool {
        true
    }

    fn record(&self, state: &mut RdfState, quad: Quad);

    /// Called once per entity, before its statements are recorded
    fn before_entity(
        &self,
        _ctx: &MappingContext,
        _conn: &dyn StoreConnection,
        _meta: &EntityMetadata,
        _id: &NamedNode,
        _state: &mut RdfState,
    ) -> SemanticResult<()> {
        Ok(())
    }

    /// Cascade into a related resource known only by its id
    fn cascade_reference(
        &self,
        _ctx: &MappingContext,
        _conn: &dyn StoreConnection,
        _meta: &EntityMetadata,
        _id: &NamedNode,
        _state: &mut RdfState,
    ) -> SemanticResult<()> {
        Ok(())
    }
}

/// Adds the entity's statements
#[derive(Debug, Clone, Copy)]
pub struct CreateHandler {
    pub allow_empty: bool,
}

impl StatementsHandler for CreateHandler {
    fn cascade_type(&self) -> Cascade {
        Cascade::Save
    }

    fn allow_empty(&self) -> bool {
        self.allow_empty
    }

    fn record(&self, state: &mut RdfState, quad: Quad) {
        state.record_add(quad);
    }
}

/// Replaces the stored statements of the entity's own predicates
#[derive(Debug, Clone, Copy)]
pub struct UpdateHandler {
    pub allow_empty: bool,
}

impl StatementsHandler for UpdateHandler {
    fn cascade_type(&self) -> Cascade {
        Cascade::Save
    }

    fn allow_empty(&self) -> bool {
        self.allow_empty
    }

    fn record(&self, state: &mut RdfState, quad: Quad) {
        state.record_add(quad);
    }

    fn before_entity(
        &self,
        ctx: &MappingContext,
        conn: &dyn StoreConnection,
        meta: &EntityMetadata,
        id: &NamedNode,
        state: &mut RdfState,
    ) -> SemanticResult<()> {
        for quad in stored_owned_statements(ctx, conn, meta, id)? {
            state.record_delete(quad);
        }
        Ok(())
    }
}

/// Removes the entity's statements, stored or in memory
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteHandler;

impl StatementsHandler for DeleteHandler {
    fn cascade_type(&self) -> Cascade {
        Cascade::Delete
    }

    fn allow_empty(&self) -> bool {
        true
    }

    fn emit_context_assignment(&self) -> bool {
        false
    }

    fn record(&self, state: &mut RdfState, quad: Quad) {
        state.record_delete(quad);
    }

    fn before_entity(
        &self,
        ctx: &MappingContext,
        conn: &dyn StoreConnection,
        meta: &EntityMetadata,
        id: &NamedNode,
        state: &mut RdfState,
    ) -> SemanticResult<()> {
        for quad in stored_owned_statements(ctx, conn, meta, id)? {
            state.record_delete(quad);
        }
        Ok(())
    }

    fn cascade_reference(
        &self,
        ctx: &MappingContext,
        conn: &dyn StoreConnection,
        meta: &EntityMetadata,
        id: &NamedNode,
        state: &mut RdfState,
    ) -> SemanticResult<()> {
        self.before_entity(ctx, conn, meta, id, state)
    }
}

/// Stored statements of the predicates a type owns for one resource: its
/// type statement, its literal, context and outgoing association statements,
/// and the statements of its incoming associations pointing at it.
pub fn stored_owned_statements(
    ctx: &MappingContext,
    conn: &dyn StoreConnection,
    meta: &EntityMetadata,
    id: &NamedNode,
) -> SemanticResult<Vec<Quad>> {
    let mut owned = HashSet::new();
    let mut incoming = Vec::new();
    for property in meta.properties() {
        match property.kind() {
            PropertyKind::Id => {}
            PropertyKind::Context | PropertyKind::Simple { .. } => {
                owned.insert(property.predicate()?.clone());
            }
            PropertyKind::Association { direction, .. } => {
                if direction.is_outgoing() {
                    owned.insert(property.predicate()?.clone());
                }
                if direction.is_incoming() {
                    incoming.push(link_predicate(ctx, property)?);
                }
            }
        }
    }

    let rdf_type = rdf_type();
    let mut quads: Vec<Quad> = conn
        .statements(&QuadPattern::subject(id.clone()))?
        .into_iter()
        .filter(|q| {
            (q.predicate == rdf_type && q.object.as_named_node() == Some(meta.rdf_type()))
                || owned.contains(q.predicate.as_named_node())
        })
        .collect();
    for predicate in incoming {
        quads.extend(conn.statements(&QuadPattern::object(id.clone()).with_predicate(predicate))?);
    }
    Ok(quads)
}

/// Predicate of `(related, p, this)` statements: the inverse property's
/// predicate when one is mapped, else the property's own
fn link_predicate(ctx: &MappingContext, property: &PropertyMetadata) -> SemanticResult<NamedNode> {
    match ctx.inverse_property(property)? {
        Some(inverse) => Ok(inverse.predicate()?.clone()),
        None => Ok(property.predicate()?.clone()),
    }
}

/// Traversal of an entity graph into one [`RdfState`]
pub struct EntityWriter<'a, H: StatementsHandler> {
    ctx: &'a MappingContext,
    conn: &'a dyn StoreConnection,
    handler: H,
    state: RdfState,
    visited: HashSet<NamedNode>,
}

impl<'a, H: StatementsHandler> EntityWriter<'a, H> {
    pub fn new(ctx: &'a MappingContext, conn: &'a dyn StoreConnection, handler: H) -> Self {
        Self {
            ctx,
            conn,
            handler,
            state: RdfState::new(),
            visited: HashSet::new(),
        }
    }

    /// Record the statements of `entity` and, where `policy` and the
    /// association annotations cascade, of its related entities. Returns the
    /// entity's resource id.
    pub fn write(&mut self, entity: &EntityRef, policy: &MappingPolicy) -> SemanticResult<NamedNode> {
        let meta = self.ctx.metadata_for(entity)?;
        let id = resource_id(self.ctx, &meta, entity)?;
        if !self.visited.insert(id.clone()) {
            debug!("{} already visited, not descending again", id);
            return Ok(id);
        }
        self.handler
            .before_entity(self.ctx, self.conn, &meta, &id, &mut self.state)?;

        // Copy the values out so no entity lock is held while recursing
        let values: Vec<(_, FieldValue)> = {
            let guard = entity.read()?;
            meta.properties()
                .iter()
                .map(|p| (p.clone(), guard.get_value(p.name())))
                .collect()
        };

        let graph = match values.iter().find(|(p, _)| p.is_context()) {
            Some((_, value)) => reference(self.ctx, &meta, value)?,
            None => None,
        };

        self.handler.record(
            &mut self.state,
            Quad::new(id.clone(), rdf_type(), meta.rdf_type().clone(), graph.clone()),
        );

        let mut emitted = 0;
        for (property, value) in &values {
            match property.kind() {
                PropertyKind::Id => {}
                PropertyKind::Context => {
                    if let Some(g) = &graph {
                        if self.handler.emit_context_assignment() {
                            let quad = Quad::triple(id.clone(), property.predicate()?.clone(), g.clone());
                            self.handler.record(&mut self.state, quad);
                        }
                        emitted += 1;
                    }
                }
                PropertyKind::Simple {
                    datatype,
                    languages,
                } => {
                    let predicate = property.predicate()?;
                    let language = languages.first().map(String::as_str);
                    for item in value.items() {
                        let object = ValueCodec::encode(item, datatype.as_ref(), language)?;
                        let quad = Quad::new(id.clone(), predicate.clone(), object, graph.clone());
                        self.handler.record(&mut self.state, quad);
                        emitted += 1;
                    }
                }
                PropertyKind::Association { .. } => {
                    for item in value.items() {
                        emitted += self.write_link(property, item, &id, graph.as_ref(), policy)?;
                    }
                }
            }
        }

        if emitted == 0 && !self.handler.allow_empty() {
            return Err(MappingError::EmptyEntity(id.as_str().to_string()).into());
        }
        Ok(id)
    }

    /// Cascade into a resource known only by id, as for an id-only association
    pub fn write_reference(&mut self, meta: &EntityMetadata, id: &NamedNode) -> SemanticResult<()> {
        if self.visited.insert(id.clone()) {
            self.handler
                .cascade_reference(self.ctx, self.conn, meta, id, &mut self.state)?;
        }
        Ok(())
    }

    /// Connection the writer reads stored statements from
    pub fn connection(&self) -> &'a dyn StoreConnection {
        self.conn
    }

    /// Net diff of everything recorded
    pub fn finish(self) -> RdfDiff {
        self.state.finalize_diff()
    }

    fn write_link(
        &mut self,
        property: &PropertyMetadata,
        item: &FieldValue,
        id: &NamedNode,
        graph: Option<&NamedNode>,
        policy: &MappingPolicy,
    ) -> SemanticResult<usize> {
        let effective = policy.combine_with(property.policy());
        let cascade = effective.should_cascade(self.handler.cascade_type());

        let related = match item {
            FieldValue::Entity(entity) => self.related_entity(property, entity, cascade, &effective)?,
            FieldValue::Lazy(lazy) => match lazy.get() {
                Some(entity) => self.related_entity(property, entity, cascade, &effective)?,
                None => self.related_id(property, lazy.id(), cascade)?,
            },
            FieldValue::Iri(related) => self.related_id(property, related, cascade)?,
            other => {
                return Err(MappingError::rejected(property.name(), "entity reference", other).into())
            }
        };

        let mut count = 0;
        let direction = property.direction().unwrap_or_default();
        if direction.is_outgoing() {
            let quad = Quad::new(
                id.clone(),
                property.predicate()?.clone(),
                related.clone(),
                graph.cloned(),
            );
            self.handler.record(&mut self.state, quad);
            count += 1;
        }
        if direction.is_incoming() {
            let predicate = link_predicate(self.ctx, property)?;
            let quad = Quad::new(related, predicate, id.clone(), graph.cloned());
            self.handler.record(&mut self.state, quad);
            count += 1;
        }
        Ok(count)
    }

    fn related_entity(
        &mut self,
        property: &PropertyMetadata,
        entity: &EntityRef,
        cascade: bool,
        effective: &MappingPolicy,
    ) -> SemanticResult<NamedNode> {
        if cascade {
            debug!(
                "Cascading {:?} through {}",
                self.handler.cascade_type(),
                property.name()
            );
            self.write(entity, effective)
        } else {
            let meta = self.ctx.metadata_for(entity)?;
            resource_id(self.ctx, &meta, entity)
        }
    }

    fn related_id(
        &mut self,
        property: &PropertyMetadata,
        related: &NamedNode,
        cascade: bool,
    ) -> SemanticResult<NamedNode> {
        if cascade {
            if let Some(target) = property.target_type() {
                let meta = self.ctx.metadata(target)?;
                self.write_reference(&meta, related)?;
            }
        }
        Ok(related.clone())
    }
}
