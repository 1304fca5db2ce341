//! Quad query façade over a statement store
//!
//! Every call opens one store connection and releases it before returning.
//! Writes are committed on success; when anything fails, a rollback is
//! attempted and the original error is returned.

use crate::config::{CountStrategy, MappingConfig};
use crate::convert::RdfDiff;
use crate::error::{SemanticError, SemanticResult};
use crate::rdf::{
    Namespace, NamedNode, Quad, QuadPattern, RdfFormat, RdfObject, RdfParser, RdfPredicate,
    RdfSubject,
};
use crate::sparql::{QueryForm, SparqlQuery, SparqlResults, COUNT_VARIABLE};
use crate::store::{StatementStore, StoreConnection, StoreError};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Statement-level access to a store
#[derive(Clone)]
pub struct SemanticDatabase {
    store: Arc<dyn StatementStore>,
    config: MappingConfig,
}

impl SemanticDatabase {
    pub fn new(store: Arc<dyn StatementStore>, config: MappingConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn StatementStore> {
        &self.store
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Run `f` against one connection without committing
    pub fn read<T>(
        &self,
        f: impl FnOnce(&dyn StoreConnection) -> SemanticResult<T>,
    ) -> SemanticResult<T> {
        let conn = self.connection()?;
        f(conn.as_ref())
    }

    /// Run `f` against one connection and commit what it staged.
    ///
    /// On failure the staged changes are rolled back. A failing rollback is
    /// logged; the error of `f` or of the commit is what gets returned.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&mut dyn StoreConnection) -> SemanticResult<T>,
    ) -> SemanticResult<T> {
        let mut conn = self.connection()?;
        let outcome = f(conn.as_mut()).and_then(|value| {
            conn.commit().map_err(|e| {
                error!("Commit failed: {}", e);
                SemanticError::from(e)
            })?;
            Ok(value)
        });
        if outcome.is_err() {
            if let Err(e) = conn.rollback() {
                error!("Rollback failed: {}", e);
            }
        }
        outcome
    }

    /// Stage a diff on a connection: deletions first, then additions
    pub fn stage(conn: &mut dyn StoreConnection, diff: &RdfDiff) -> SemanticResult<()> {
        debug!(
            "Applying {} deletions and {} additions",
            diff.deletes.len(),
            diff.adds.len()
        );
        if !diff.deletes.is_empty() {
            conn.remove(&diff.deletes)?;
        }
        if !diff.adds.is_empty() {
            conn.add(&diff.adds)?;
        }
        Ok(())
    }

    /// Apply a diff atomically
    pub fn apply(&self, diff: &RdfDiff) -> SemanticResult<()> {
        self.write(|conn| Self::stage(conn, diff))
    }

    /// Quads matching a pattern
    pub fn statements(&self, pattern: &QuadPattern) -> SemanticResult<Vec<Quad>> {
        self.read(|conn| Ok(conn.statements(pattern)?))
    }

    pub fn statements_by_subject(&self, subject: impl Into<RdfSubject>) -> SemanticResult<Vec<Quad>> {
        self.statements(&QuadPattern::subject(subject))
    }

    pub fn statements_by_predicate(
        &self,
        predicate: impl Into<RdfPredicate>,
    ) -> SemanticResult<Vec<Quad>> {
        self.statements(&QuadPattern::default().with_predicate(predicate))
    }

    pub fn statements_by_object(&self, object: impl Into<RdfObject>) -> SemanticResult<Vec<Quad>> {
        self.statements(&QuadPattern::object(object))
    }

    /// Quads of one named graph
    pub fn statements_by_context(&self, context: &NamedNode) -> SemanticResult<Vec<Quad>> {
        self.statements(&QuadPattern::new(None, None, None, Some(context.clone())))
    }

    /// Quads matching a triple pattern in any graph
    pub fn statements_by_triple(
        &self,
        subject: Option<RdfSubject>,
        predicate: Option<RdfPredicate>,
        object: Option<RdfObject>,
    ) -> SemanticResult<Vec<Quad>> {
        self.statements(&QuadPattern::new(subject, predicate, object, None))
    }

    /// Quads matching a quad pattern; a `None` context matches every graph
    pub fn statements_by_quad(
        &self,
        subject: Option<RdfSubject>,
        predicate: Option<RdfPredicate>,
        object: Option<RdfObject>,
        context: Option<NamedNode>,
    ) -> SemanticResult<Vec<Quad>> {
        self.statements(&QuadPattern::new(subject, predicate, object, context))
    }

    /// Evaluate a query
    pub fn query_results(&self, query: &str) -> SemanticResult<SparqlResults> {
        let query = SparqlQuery::parse(query)?;
        self.read(|conn| Ok(conn.evaluate(&query)?))
    }

    /// Evaluate a query restricted to `limit` solutions from `offset`.
    ///
    /// Pages follow the store's evaluation order. They only partition the
    /// full result when that order is stable between calls, which holds for
    /// the in-memory store, or when the query has an ORDER BY.
    pub fn query_results_page(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> SemanticResult<SparqlResults> {
        let query = SparqlQuery::parse(query)?.paginated(offset, limit)?;
        self.read(|conn| Ok(conn.evaluate(&query)?))
    }

    /// Number of solutions of a SELECT query, or statements of a CONSTRUCT
    pub fn query_results_count(&self, query: &str) -> SemanticResult<usize> {
        let query = SparqlQuery::parse(query)?;
        self.read(|conn| count_solutions(conn, &query, self.config.count_strategy))
    }

    /// Evaluate a CONSTRUCT query
    pub fn graph_query(&self, query: &str) -> SemanticResult<Vec<Quad>> {
        let query = SparqlQuery::parse(query)?;
        if query.form() != QueryForm::Construct {
            return Err(SemanticError::MalformedQuery(
                "graph queries must be CONSTRUCT queries".to_string(),
            ));
        }
        self.read(|conn| Ok(conn.evaluate(&query)?.into_quads()))
    }

    /// Number of quads in the store
    pub fn count(&self) -> SemanticResult<usize> {
        self.read(|conn| Ok(conn.size()?))
    }

    /// Named graphs in use
    pub fn contexts(&self) -> SemanticResult<Vec<NamedNode>> {
        self.read(|conn| Ok(conn.contexts()?))
    }

    pub fn namespaces(&self) -> SemanticResult<Vec<Namespace>> {
        self.read(|conn| Ok(conn.namespaces()?))
    }

    pub fn add_namespace(&self, prefix: &str, iri: &str) -> SemanticResult<()> {
        self.write(|conn| Ok(conn.set_namespace(prefix, iri)?))
    }

    /// IRI bound to the store's default (`""`) prefix
    pub fn default_namespace(&self) -> SemanticResult<Option<String>> {
        Ok(self
            .namespaces()?
            .into_iter()
            .find(|ns| ns.prefix.is_empty())
            .map(|ns| ns.iri))
    }

    pub fn add_statements(&self, quads: &[Quad]) -> SemanticResult<()> {
        self.write(|conn| Ok(conn.add(quads)?))
    }

    pub fn remove_statements(&self, quads: &[Quad]) -> SemanticResult<()> {
        self.write(|conn| Ok(conn.remove(quads)?))
    }

    /// Parse an RDF file, picking the format from its extension, and add its
    /// statements in one unit of work
    pub fn add_statements_from_file(&self, path: &Path) -> SemanticResult<usize> {
        let format = RdfFormat::from_path(path).map_err(StoreError::from)?;
        let quads = RdfParser::parse_file(path).map_err(|e| {
            error!("Failed to ingest {}: {}", path.display(), e);
            StoreError::from(e)
        })?;
        self.add_statements(&quads)?;
        info!("Ingested {} statements from {} ({:?})", quads.len(), path.display(), format);
        Ok(quads.len())
    }

    /// Remove every quad of the given graphs, or all quads when none are given
    pub fn clear(&self, contexts: &[NamedNode]) -> SemanticResult<()> {
        self.write(|conn| Ok(conn.clear(contexts)?))
    }

    fn connection(&self) -> SemanticResult<Box<dyn StoreConnection + '_>> {
        self.store.connection().map_err(|e| {
            error!("Failed to open store connection: {}", e);
            SemanticError::from(e)
        })
    }
}

/// Count solutions with the configured strategy
pub(crate) fn count_solutions(
    conn: &dyn StoreConnection,
    query: &SparqlQuery,
    strategy: CountStrategy,
) -> SemanticResult<usize> {
    let aggregate = match strategy {
        CountStrategy::Materialize => false,
        CountStrategy::Aggregate => true,
        CountStrategy::Auto => {
            conn.supports_count_aggregate() && query.form() == QueryForm::Select
        }
    };
    if aggregate {
        aggregate_count(conn, query)
    } else {
        Ok(conn.evaluate(query)?.len())
    }
}

/// Let the store count; the result must be a single numeric binding
fn aggregate_count(conn: &dyn StoreConnection, query: &SparqlQuery) -> SemanticResult<usize> {
    let count_query = query.count_query()?;
    let results = conn.evaluate(&count_query)?;
    if results.variables().is_empty() {
        return Err(SemanticError::MalformedQuery(
            "count query projects no variable".to_string(),
        ));
    }
    let solution = match results.solutions() {
        [solution] => solution,
        [] => {
            return Err(SemanticError::QueryEvaluation(
                "count query returned no count results".to_string(),
            ))
        }
        many => {
            return Err(SemanticError::QueryEvaluation(format!(
                "count query returned {} results",
                many.len()
            )))
        }
    };
    if solution.len() != 1 {
        return Err(SemanticError::QueryEvaluation(format!(
            "count result has {} bindings",
            solution.len()
        )));
    }
    let term = solution
        .get(COUNT_VARIABLE)
        .or_else(|| solution.bindings.values().next())
        .ok_or_else(|| SemanticError::QueryEvaluation("count result is unbound".to_string()))?;
    term.lexical().trim().parse::<usize>().map_err(|_| {
        SemanticError::QueryEvaluation(format!("count result '{}' is not numeric", term.lexical()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::Literal;
    use crate::store::MemoryStore;

    fn node(iri: &str) -> NamedNode {
        NamedNode::new(iri).unwrap()
    }

    fn database(strategy: CountStrategy) -> SemanticDatabase {
        let config = MappingConfig {
            count_strategy: strategy,
            ..MappingConfig::default()
        };
        let db = SemanticDatabase::new(Arc::new(MemoryStore::new()), config);
        let name = node("http://xmlns.com/foaf/0.1/name");
        let quads: Vec<Quad> = ["alice", "bob", "carol", "dave"]
            .iter()
            .map(|n| {
                Quad::new(
                    node(&format!("http://example.org/{}", n)),
                    name.clone(),
                    Literal::new_simple_literal(*n),
                    Some(node("http://example.org/people")),
                )
            })
            .collect();
        db.add_statements(&quads).unwrap();
        db
    }

    #[test]
    fn test_pattern_shortcuts() {
        let db = database(CountStrategy::Auto);
        assert_eq!(db.count().unwrap(), 4);
        assert_eq!(
            db.statements_by_subject(node("http://example.org/alice")).unwrap().len(),
            1
        );
        assert_eq!(
            db.statements_by_predicate(node("http://xmlns.com/foaf/0.1/name"))
                .unwrap()
                .len(),
            4
        );
        assert_eq!(
            db.statements_by_object(Literal::new_simple_literal("bob"))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            db.statements_by_context(&node("http://example.org/people"))
                .unwrap()
                .len(),
            4
        );
        assert_eq!(db.contexts().unwrap(), vec![node("http://example.org/people")]);
    }

    #[test]
    fn test_count_strategies_agree() {
        let query = "SELECT ?s WHERE { ?s ?p ?o }";
        for strategy in [
            CountStrategy::Auto,
            CountStrategy::Materialize,
            CountStrategy::Aggregate,
        ] {
            let db = database(strategy);
            assert_eq!(db.query_results_count(query).unwrap(), 4);
        }
    }

    #[test]
    fn test_malformed_queries() {
        let db = database(CountStrategy::Auto);
        assert!(matches!(
            db.query_results("SELECT WHERE {"),
            Err(SemanticError::MalformedQuery(_))
        ));
        assert!(matches!(
            db.graph_query("SELECT ?s WHERE { ?s ?p ?o }"),
            Err(SemanticError::MalformedQuery(_))
        ));

        let aggregate = database(CountStrategy::Aggregate);
        assert!(matches!(
            aggregate.query_results_count("ASK { ?s ?p ?o }"),
            Err(SemanticError::MalformedQuery(_))
        ));
    }

    #[test]
    fn test_namespaces_and_clear() {
        let db = database(CountStrategy::Auto);
        assert_eq!(db.default_namespace().unwrap(), None);
        db.add_namespace("", "http://example.org/").unwrap();
        assert_eq!(
            db.default_namespace().unwrap().as_deref(),
            Some("http://example.org/")
        );

        db.clear(&[node("http://example.org/other")]).unwrap();
        assert_eq!(db.count().unwrap(), 4);
        db.clear(&[]).unwrap();
        assert_eq!(db.count().unwrap(), 0);
    }
}
