//! In-memory quad store
//!
//! Quads are kept in insertion order, which is the order every lookup and
//! query sees them in. Subject, object and graph indices narrow pattern
//! lookups; results are re-sorted into store order.

use super::{StatementStore, StoreConnection, StoreError, StoreResult};
use crate::rdf::{
    Namespace, NamedNode, Quad, QuadPattern, RdfFormat, RdfObject, RdfParser, RdfSubject,
};
use crate::sparql::{QuadSource, SparqlExecutor, SparqlQuery, SparqlResults};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Indexed quad storage
#[derive(Default)]
struct StoreData {
    /// All quads (primary storage, insertion order)
    quads: IndexSet<Quad>,
    by_subject: FxHashMap<RdfSubject, FxHashSet<Quad>>,
    by_object: FxHashMap<RdfObject, FxHashSet<Quad>>,
    by_graph: FxHashMap<Option<NamedNode>, FxHashSet<Quad>>,
}

fn index_insert<K: Hash + Eq>(index: &mut FxHashMap<K, FxHashSet<Quad>>, key: K, quad: &Quad) {
    index.entry(key).or_default().insert(quad.clone());
}

fn index_remove<K: Hash + Eq>(index: &mut FxHashMap<K, FxHashSet<Quad>>, key: &K, quad: &Quad) {
    if let Some(set) = index.get_mut(key) {
        set.remove(quad);
        if set.is_empty() {
            index.remove(key);
        }
    }
}

impl StoreData {
    fn insert(&mut self, quad: Quad) -> bool {
        if self.quads.contains(&quad) {
            return false;
        }
        index_insert(&mut self.by_subject, quad.subject.clone(), &quad);
        index_insert(&mut self.by_object, quad.object.clone(), &quad);
        index_insert(&mut self.by_graph, quad.graph.clone(), &quad);
        self.quads.insert(quad);
        true
    }

    fn remove(&mut self, quad: &Quad) -> bool {
        if !self.quads.shift_remove(quad) {
            return false;
        }
        index_remove(&mut self.by_subject, &quad.subject, quad);
        index_remove(&mut self.by_object, &quad.object, quad);
        index_remove(&mut self.by_graph, &quad.graph, quad);
        true
    }

    fn contains(&self, quad: &Quad) -> bool {
        self.quads.contains(quad)
    }

    fn len(&self) -> usize {
        self.quads.len()
    }

    /// Quads matching a pattern, in store order
    fn matching(&self, pattern: &QuadPattern) -> Vec<Quad> {
        let candidates = if let Some(subject) = &pattern.subject {
            self.by_subject.get(subject)
        } else if let Some(object) = &pattern.object {
            self.by_object.get(object)
        } else if let Some(graph) = &pattern.graph {
            self.by_graph.get(graph)
        } else {
            return self
                .quads
                .iter()
                .filter(|q| pattern.matches(q))
                .cloned()
                .collect();
        };

        let Some(candidates) = candidates else {
            return Vec::new();
        };
        let mut found: Vec<(usize, &Quad)> = candidates
            .iter()
            .filter(|q| pattern.matches(q))
            .map(|q| (self.quads.get_index_of(q).unwrap_or(usize::MAX), q))
            .collect();
        found.sort_by_key(|(position, _)| *position);
        found.into_iter().map(|(_, q)| q.clone()).collect()
    }
}

/// In-memory statement store
pub struct MemoryStore {
    data: RwLock<StoreData>,
    namespaces: RwLock<IndexMap<String, String>>,
    open_connections: AtomicUsize,
    max_connections: Option<usize>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(StoreData::default()),
            namespaces: RwLock::new(IndexMap::new()),
            open_connections: AtomicUsize::new(0),
            max_connections: None,
        }
    }

    /// Limit the number of simultaneously open connections
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Number of committed quads
    pub fn len(&self) -> usize {
        self.read_data().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Connections currently open
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    /// Parse and insert RDF data; returns the number of new quads
    pub fn load_str(&self, input: &str, format: RdfFormat) -> StoreResult<usize> {
        let quads = RdfParser::parse(input, format)?;
        self.insert_all(quads)
    }

    /// Parse and insert an RDF file, picking the format from its extension
    pub fn load_file(&self, path: &Path) -> StoreResult<usize> {
        let quads = RdfParser::parse_file(path)?;
        let added = self.insert_all(quads)?;
        info!("Loaded {} statements from {}", added, path.display());
        Ok(added)
    }

    fn insert_all(&self, quads: Vec<Quad>) -> StoreResult<usize> {
        let mut data = self.write_data()?;
        Ok(quads.into_iter().filter(|q| data.insert(q.clone())).count())
    }

    fn read_data(&self) -> StoreResult<RwLockReadGuard<'_, StoreData>> {
        self.data
            .read()
            .map_err(|e| StoreError::Access(format!("store lock poisoned: {}", e)))
    }

    fn write_data(&self) -> StoreResult<RwLockWriteGuard<'_, StoreData>> {
        self.data
            .write()
            .map_err(|e| StoreError::Access(format!("store lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementStore for MemoryStore {
    fn connection(&self) -> StoreResult<Box<dyn StoreConnection + '_>> {
        let opened = self.open_connections.fetch_add(1, Ordering::SeqCst);
        if let Some(max) = self.max_connections {
            if opened >= max {
                self.open_connections.fetch_sub(1, Ordering::SeqCst);
                warn!("Connection refused: {} connections already open", opened);
                return Err(StoreError::ConnectionLimit(max));
            }
        }
        Ok(Box::new(MemoryConnection {
            store: self,
            pending_add: IndexSet::new(),
            pending_remove: IndexSet::new(),
        }))
    }
}

/// Connection to a [`MemoryStore`] with buffered changes
pub struct MemoryConnection<'a> {
    store: &'a MemoryStore,
    pending_add: IndexSet<Quad>,
    pending_remove: IndexSet<Quad>,
}

/// Committed data overlaid with a connection's pending changes
struct ConnectionView<'b> {
    data: &'b StoreData,
    pending_add: &'b IndexSet<Quad>,
    pending_remove: &'b IndexSet<Quad>,
}

impl QuadSource for ConnectionView<'_> {
    fn quads_for_pattern(&self, pattern: &QuadPattern) -> Vec<Quad> {
        let mut quads: Vec<Quad> = self
            .data
            .matching(pattern)
            .into_iter()
            .filter(|q| !self.pending_remove.contains(q))
            .collect();
        quads.extend(
            self.pending_add
                .iter()
                .filter(|q| pattern.matches(q) && !self.data.contains(q))
                .cloned(),
        );
        quads
    }
}

impl MemoryConnection<'_> {
    fn with_view<T>(&self, f: impl FnOnce(&ConnectionView<'_>) -> T) -> StoreResult<T> {
        let data = self.store.read_data()?;
        let view = ConnectionView {
            data: &data,
            pending_add: &self.pending_add,
            pending_remove: &self.pending_remove,
        };
        Ok(f(&view))
    }
}

impl StoreConnection for MemoryConnection<'_> {
    fn statements(&self, pattern: &QuadPattern) -> StoreResult<Vec<Quad>> {
        self.with_view(|view| view.quads_for_pattern(pattern))
    }

    fn add(&mut self, quads: &[Quad]) -> StoreResult<()> {
        for quad in quads {
            self.pending_remove.shift_remove(quad);
            self.pending_add.insert(quad.clone());
        }
        Ok(())
    }

    fn remove(&mut self, quads: &[Quad]) -> StoreResult<()> {
        for quad in quads {
            self.pending_add.shift_remove(quad);
            self.pending_remove.insert(quad.clone());
        }
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        if self.pending_add.is_empty() && self.pending_remove.is_empty() {
            return Ok(());
        }
        let mut data = self.store.write_data()?;
        let removed = self
            .pending_remove
            .drain(..)
            .filter(|q| data.remove(q))
            .count();
        let added = self
            .pending_add
            .drain(..)
            .filter(|q| data.insert(q.clone()))
            .count();
        debug!("Committed {} additions and {} removals", added, removed);
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        debug!(
            "Rolled back {} pending additions and {} pending removals",
            self.pending_add.len(),
            self.pending_remove.len()
        );
        self.pending_add.clear();
        self.pending_remove.clear();
        Ok(())
    }

    fn evaluate(&self, query: &SparqlQuery) -> StoreResult<SparqlResults> {
        self.with_view(|view| SparqlExecutor::new(view).execute(query))?
            .map_err(StoreError::from)
    }

    fn size(&self) -> StoreResult<usize> {
        self.with_view(|view| {
            let removed = view
                .pending_remove
                .iter()
                .filter(|q| view.data.contains(q))
                .count();
            let added = view
                .pending_add
                .iter()
                .filter(|q| !view.data.contains(q))
                .count();
            view.data.len() - removed + added
        })
    }

    fn contexts(&self) -> StoreResult<Vec<NamedNode>> {
        self.with_view(|view| {
            let graphs: IndexSet<NamedNode> = view
                .quads_for_pattern(&QuadPattern::default())
                .into_iter()
                .filter_map(|q| q.graph)
                .collect();
            graphs.into_iter().collect()
        })
    }

    fn namespaces(&self) -> StoreResult<Vec<Namespace>> {
        let namespaces = self
            .store
            .namespaces
            .read()
            .map_err(|e| StoreError::Access(format!("namespace lock poisoned: {}", e)))?;
        Ok(namespaces
            .iter()
            .map(|(prefix, iri)| Namespace::new(prefix.clone(), iri.clone()))
            .collect())
    }

    fn set_namespace(&mut self, prefix: &str, iri: &str) -> StoreResult<()> {
        let mut namespaces = self
            .store
            .namespaces
            .write()
            .map_err(|e| StoreError::Access(format!("namespace lock poisoned: {}", e)))?;
        namespaces.insert(prefix.to_string(), iri.to_string());
        Ok(())
    }

    fn clear(&mut self, contexts: &[NamedNode]) -> StoreResult<()> {
        let doomed = self.with_view(|view| {
            if contexts.is_empty() {
                view.quads_for_pattern(&QuadPattern::default())
            } else {
                contexts
                    .iter()
                    .flat_map(|g| {
                        view.quads_for_pattern(&QuadPattern::new(None, None, None, Some(g.clone())))
                    })
                    .collect()
            }
        })?;
        self.remove(&doomed)
    }

    fn supports_count_aggregate(&self) -> bool {
        true
    }
}

impl Drop for MemoryConnection<'_> {
    fn drop(&mut self) {
        if !self.pending_add.is_empty() || !self.pending_remove.is_empty() {
            debug!(
                "Discarding {} uncommitted changes",
                self.pending_add.len() + self.pending_remove.len()
            );
        }
        self.store.open_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Literal, RdfPredicate};

    fn quad(s: &str, o: &str) -> Quad {
        Quad::triple(
            NamedNode::new(s).unwrap(),
            RdfPredicate::new("http://example.org/p").unwrap(),
            Literal::new_simple_literal(o),
        )
    }

    #[test]
    fn test_commit_and_visibility() {
        let store = MemoryStore::new();
        let mut conn = store.connection().unwrap();
        conn.add(&[quad("http://example.org/a", "1")]).unwrap();

        // Pending changes are visible on the same connection only
        assert_eq!(conn.size().unwrap(), 1);
        assert_eq!(store.len(), 0);

        conn.commit().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_drop_discards_uncommitted() {
        let store = MemoryStore::new();
        {
            let mut conn = store.connection().unwrap();
            conn.add(&[quad("http://example.org/a", "1")]).unwrap();
            assert_eq!(store.open_connections(), 1);
        }
        assert_eq!(store.open_connections(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_rollback() {
        let store = MemoryStore::new();
        let mut conn = store.connection().unwrap();
        conn.add(&[quad("http://example.org/a", "1")]).unwrap();
        conn.commit().unwrap();

        conn.remove(&[quad("http://example.org/a", "1")]).unwrap();
        assert_eq!(conn.size().unwrap(), 0);
        conn.rollback().unwrap();
        conn.commit().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let store = MemoryStore::new();
        let mut conn = store.connection().unwrap();
        conn.add(&[quad("http://example.org/a", "1"), quad("http://example.org/a", "1")])
            .unwrap();
        conn.commit().unwrap();
        conn.add(&[quad("http://example.org/a", "1")]).unwrap();
        conn.commit().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_order_is_insertion_order() {
        let store = MemoryStore::new();
        let mut conn = store.connection().unwrap();
        let quads: Vec<Quad> = ["d", "a", "c", "b"]
            .iter()
            .map(|s| quad(&format!("http://example.org/{}", s), s))
            .collect();
        conn.add(&quads).unwrap();
        conn.commit().unwrap();
        conn.remove(&[quads[1].clone()]).unwrap();
        conn.commit().unwrap();

        let found = conn.statements(&QuadPattern::default()).unwrap();
        assert_eq!(found, vec![quads[0].clone(), quads[2].clone(), quads[3].clone()]);

        let by_object = conn
            .statements(&QuadPattern::object(Literal::new_simple_literal("c")))
            .unwrap();
        assert_eq!(by_object, vec![quads[2].clone()]);
    }

    #[test]
    fn test_connection_limit() {
        let store = MemoryStore::new().with_max_connections(1);
        let first = store.connection().unwrap();
        assert!(matches!(
            store.connection(),
            Err(StoreError::ConnectionLimit(1))
        ));
        drop(first);
        assert!(store.connection().is_ok());
    }

    #[test]
    fn test_contexts_and_clear() {
        let store = MemoryStore::new();
        let graph = NamedNode::new("http://example.org/g").unwrap();
        let mut conn = store.connection().unwrap();
        let mut scoped = quad("http://example.org/a", "1");
        scoped.graph = Some(graph.clone());
        conn.add(&[scoped, quad("http://example.org/b", "2")]).unwrap();
        conn.commit().unwrap();

        assert_eq!(conn.contexts().unwrap(), vec![graph.clone()]);
        conn.clear(&[graph]).unwrap();
        conn.commit().unwrap();
        assert_eq!(store.len(), 1);

        conn.clear(&[]).unwrap();
        conn.commit().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_str() {
        let store = MemoryStore::new();
        let added = store
            .load_str(
                "<http://example.org/a> <http://example.org/p> \"x\" .\n",
                RdfFormat::NTriples,
            )
            .unwrap();
        assert_eq!(added, 1);
        assert!(matches!(
            store.load_str("<http://example.org/a> <broken", RdfFormat::NTriples),
            Err(StoreError::Ingest(_))
        ));
    }

    #[test]
    fn test_evaluate() {
        let store = MemoryStore::new();
        let mut conn = store.connection().unwrap();
        conn.add(&[quad("http://example.org/a", "1"), quad("http://example.org/b", "2")])
            .unwrap();
        let query = SparqlQuery::parse("SELECT ?s WHERE { ?s ?p ?o }").unwrap();
        assert_eq!(conn.evaluate(&query).unwrap().len(), 2);
        assert!(conn.supports_count_aggregate());
    }
}
