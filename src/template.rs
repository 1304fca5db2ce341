//! Entity operations
//!
//! [`SemanticTemplate`] is the caller-facing entry point: it finds, saves and
//! deletes entities, one store connection per call. Reads go through the
//! [`EntityStateTransmitter`]; writes build a diff with an [`EntityWriter`]
//! and stage it on the same connection before committing.

use crate::config::{MappingConfig, DEFAULT_NAMESPACE};
use crate::convert::{
    resource_id, CreateHandler, DeleteHandler, EntityStateTransmitter, EntityWriter,
    StatementsHandler, UpdateHandler,
};
use crate::database::{count_solutions, SemanticDatabase};
use crate::error::SemanticResult;
use crate::mapping::{
    EntityMetadata, EntityRef, LazyEntity, MappingContext, MappingPolicy, TypeMetadataProvider,
};
use crate::rdf::{rdf_type, NamedNode, QuadPattern};
use crate::sparql::{SparqlQuery, SparqlResults};
use crate::store::{StatementStore, StoreConnection};
use indexmap::IndexSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Object-graph mapping over a statement store
pub struct SemanticTemplate {
    db: SemanticDatabase,
    ctx: MappingContext,
}

impl SemanticTemplate {
    /// Create a template.
    ///
    /// Relative names resolve against the configured default namespace, else
    /// the store's `""` prefix, else [`DEFAULT_NAMESPACE`]. Store prefixes are
    /// known to name resolution unless the configuration rebinds them.
    pub fn new(
        store: Arc<dyn StatementStore>,
        provider: Arc<dyn TypeMetadataProvider>,
        config: MappingConfig,
    ) -> SemanticResult<Self> {
        let db = SemanticDatabase::new(store, config);
        let store_namespaces = db.namespaces()?;

        let mut namespaces = db.config().namespace_manager();
        for ns in store_namespaces.iter().filter(|ns| !ns.prefix.is_empty()) {
            if !db.config().namespaces.contains_key(&ns.prefix) {
                namespaces.add_prefix(ns.prefix.clone(), ns.iri.clone());
            }
        }

        let default_namespace = db
            .config()
            .default_namespace
            .clone()
            .or_else(|| {
                store_namespaces
                    .iter()
                    .find(|ns| ns.prefix.is_empty())
                    .map(|ns| ns.iri.clone())
            })
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        info!("Mapping relative names into {}", default_namespace);

        let ctx = MappingContext::new(provider, namespaces, default_namespace);
        Ok(Self { db, ctx })
    }

    pub fn database(&self) -> &SemanticDatabase {
        &self.db
    }

    pub fn context(&self) -> &MappingContext {
        &self.ctx
    }

    /// Metadata of a registered type
    pub fn metadata(&self, type_name: &str) -> SemanticResult<Arc<EntityMetadata>> {
        Ok(self.ctx.metadata(type_name)?)
    }

    /// Load the entity stored under `id`; `None` unless `(id, rdf:type, class)`
    /// is stored
    pub fn find(&self, type_name: &str, id: &NamedNode) -> SemanticResult<Option<EntityRef>> {
        self.find_with_policy(type_name, id, &MappingPolicy::new())
    }

    /// Like [`find`](Self::find), with a root policy combined into every
    /// association's own
    pub fn find_with_policy(
        &self,
        type_name: &str,
        id: &NamedNode,
        policy: &MappingPolicy,
    ) -> SemanticResult<Option<EntityRef>> {
        let meta = self.metadata(type_name)?;
        self.db.read(|conn| {
            EntityStateTransmitter::new(&self.ctx, conn).load(&meta, id, policy)
        })
    }

    /// Every stored entity of a type, in store order
    pub fn find_all(&self, type_name: &str) -> SemanticResult<Vec<EntityRef>> {
        let meta = self.metadata(type_name)?;
        self.db.read(|conn| {
            let ids = typed_resources(conn, &meta)?;
            self.load_many(conn, &meta, ids.iter())
        })
    }

    /// Entities `offset..offset + limit` of a type, in store order
    pub fn find_page(
        &self,
        type_name: &str,
        offset: usize,
        limit: usize,
    ) -> SemanticResult<Vec<EntityRef>> {
        let meta = self.metadata(type_name)?;
        let query = SparqlQuery::parse(&instances_query(&meta))?.paginated(offset, limit)?;
        self.db.read(|conn| {
            let ids = subject_bindings(conn.evaluate(&query)?);
            self.load_many(conn, &meta, ids.iter())
        })
    }

    /// Entities stored under the given ids; unknown ids are skipped
    pub fn find_all_by_ids(
        &self,
        type_name: &str,
        ids: &[NamedNode],
    ) -> SemanticResult<Vec<EntityRef>> {
        let meta = self.metadata(type_name)?;
        self.db.read(|conn| self.load_many(conn, &meta, ids.iter()))
    }

    pub fn exists(&self, type_name: &str, id: &NamedNode) -> SemanticResult<bool> {
        let meta = self.metadata(type_name)?;
        let pattern = QuadPattern::subject(id.clone())
            .with_predicate(rdf_type())
            .with_object(meta.rdf_type().clone());
        self.db.read(|conn| Ok(!conn.statements(&pattern)?.is_empty()))
    }

    /// Number of stored entities of a type
    pub fn count(&self, type_name: &str) -> SemanticResult<usize> {
        let meta = self.metadata(type_name)?;
        let query = SparqlQuery::parse(&instances_query(&meta))?;
        let strategy = self.db.config().count_strategy;
        self.db
            .read(|conn| count_solutions(conn, &query, strategy))
    }

    /// Add the entity's statements, cascading `SAVE`
    pub fn create(&self, entity: &EntityRef) -> SemanticResult<NamedNode> {
        let policy = MappingPolicy::new();
        self.write_with(self.create_handler(), |writer| writer.write(entity, &policy))
    }

    /// Replace the entity's stored statements, cascading `SAVE`
    pub fn save(&self, entity: &EntityRef) -> SemanticResult<NamedNode> {
        let policy = MappingPolicy::new();
        self.write_with(self.update_handler(), |writer| writer.write(entity, &policy))
    }

    /// Create several entities in one unit of work
    pub fn create_all(&self, entities: &[EntityRef]) -> SemanticResult<Vec<NamedNode>> {
        self.write_with(self.create_handler(), |writer| write_each(writer, entities))
    }

    /// Save several entities in one unit of work
    pub fn save_all(&self, entities: &[EntityRef]) -> SemanticResult<Vec<NamedNode>> {
        self.write_with(self.update_handler(), |writer| write_each(writer, entities))
    }

    /// Remove the entity's statements, stored or not, cascading `DELETE`
    pub fn delete(&self, entity: &EntityRef) -> SemanticResult<()> {
        let policy = MappingPolicy::new();
        self.write_with(DeleteHandler, |writer| writer.write(entity, &policy))
            .map(|_| ())
    }

    /// Remove the stored statements of a resource
    pub fn delete_by_id(&self, type_name: &str, id: &NamedNode) -> SemanticResult<()> {
        let meta = self.metadata(type_name)?;
        self.write_with(DeleteHandler, |writer| writer.write_reference(&meta, id))
    }

    /// Remove every stored entity of a type
    pub fn delete_all(&self, type_name: &str) -> SemanticResult<usize> {
        let meta = self.metadata(type_name)?;
        let deleted = self.write_with(DeleteHandler, |writer| {
            let ids = typed_resources(writer.connection(), &meta)?;
            for id in &ids {
                writer.write_reference(&meta, id)?;
            }
            Ok(ids.len())
        })?;
        debug!("Deleted {} entities of {}", deleted, meta.type_name());
        Ok(deleted)
    }

    /// Reload an instance from the store. Associations cascading `REFRESH`
    /// are loaded eagerly. Returns false when the entity is no longer stored.
    pub fn refresh(&self, entity: &EntityRef) -> SemanticResult<bool> {
        let meta = self.ctx.metadata_for(entity)?;
        let id = resource_id(&self.ctx, &meta, entity)?;
        self.db.read(|conn| {
            EntityStateTransmitter::new(&self.ctx, conn)
                .refreshing()
                .populate(entity, &meta, &id, &MappingPolicy::new())
        })
    }

    /// Load a lazy association. Later calls return the same instance.
    pub fn resolve_lazy(&self, lazy: &LazyEntity) -> SemanticResult<Option<EntityRef>> {
        if let Some(entity) = lazy.get() {
            return Ok(Some(entity.clone()));
        }
        Ok(self
            .find(lazy.type_name(), lazy.id())?
            .map(|entity| lazy.fill(entity)))
    }

    fn create_handler(&self) -> CreateHandler {
        CreateHandler {
            allow_empty: self.db.config().allow_empty_entities,
        }
    }

    fn update_handler(&self) -> UpdateHandler {
        UpdateHandler {
            allow_empty: self.db.config().allow_empty_entities,
        }
    }

    /// Build a diff with one writer, then stage and commit it on the
    /// connection the writer read from
    fn write_with<H, T>(
        &self,
        handler: H,
        f: impl FnOnce(&mut EntityWriter<'_, H>) -> SemanticResult<T>,
    ) -> SemanticResult<T>
    where
        H: StatementsHandler,
    {
        self.db.write(|conn| {
            let (value, diff) = {
                let mut writer = EntityWriter::new(&self.ctx, &*conn, handler);
                let value = f(&mut writer)?;
                (value, writer.finish())
            };
            SemanticDatabase::stage(conn, &diff)?;
            Ok(value)
        })
    }

    fn load_many<'i>(
        &self,
        conn: &dyn StoreConnection,
        meta: &Arc<EntityMetadata>,
        ids: impl Iterator<Item = &'i NamedNode>,
    ) -> SemanticResult<Vec<EntityRef>> {
        let transmitter = EntityStateTransmitter::new(&self.ctx, conn);
        let policy = MappingPolicy::new();
        let mut entities = Vec::new();
        for id in ids {
            if let Some(entity) = transmitter.load(meta, id, &policy)? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }
}

fn write_each<H: StatementsHandler>(
    writer: &mut EntityWriter<'_, H>,
    entities: &[EntityRef],
) -> SemanticResult<Vec<NamedNode>> {
    let policy = MappingPolicy::new();
    entities
        .iter()
        .map(|entity| writer.write(entity, &policy))
        .collect()
}

/// Resources typed with the entity's class, in store order
fn typed_resources(
    conn: &dyn StoreConnection,
    meta: &EntityMetadata,
) -> SemanticResult<IndexSet<NamedNode>> {
    let pattern = QuadPattern::default()
        .with_predicate(rdf_type())
        .with_object(meta.rdf_type().clone());
    Ok(conn
        .statements(&pattern)?
        .into_iter()
        .filter_map(|q| q.subject.as_named_node().cloned())
        .collect())
}

fn instances_query(meta: &EntityMetadata) -> String {
    format!(
        "SELECT DISTINCT ?s WHERE {{ ?s a <{}> }}",
        meta.rdf_type().as_str()
    )
}

fn subject_bindings(results: SparqlResults) -> Vec<NamedNode> {
    results
        .solutions()
        .iter()
        .filter_map(|s| match s.get("s") {
            Some(crate::rdf::RdfTerm::NamedNode(n)) => Some(n.clone()),
            _ => None,
        })
        .collect()
}
