//! SPARQL parsing and query rewriting using the spargebra library

use super::{SparqlError, SparqlResult};
use spargebra::algebra::{AggregateExpression, GraphPattern};
use spargebra::term::Variable;
use spargebra::Query;
use std::fmt;

/// Name of the variable bound by generated count queries
pub const COUNT_VARIABLE: &str = "count";

/// Query form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryForm {
    Select,
    Construct,
    Ask,
    Describe,
}

/// Parsed SPARQL query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlQuery {
    query: Query,
}

impl SparqlQuery {
    /// Parse a SPARQL query string
    pub fn parse(text: &str) -> SparqlResult<Self> {
        let query = Query::parse(text, None)
            .map_err(|e| SparqlError::Malformed(e.to_string()))?;
        Ok(Self { query })
    }

    pub fn form(&self) -> QueryForm {
        match &self.query {
            Query::Select { .. } => QueryForm::Select,
            Query::Construct { .. } => QueryForm::Construct,
            Query::Ask { .. } => QueryForm::Ask,
            Query::Describe { .. } => QueryForm::Describe,
        }
    }

    /// The spargebra algebra tree
    pub fn inner(&self) -> &Query {
        &self.query
    }

    /// Same query restricted to `limit` solutions starting at `offset`.
    ///
    /// The page boundaries follow the evaluation order of the store. Pages are
    /// only stable across calls when that order is, or when the query orders
    /// its solutions explicitly.
    pub fn paginated(&self, offset: usize, limit: usize) -> SparqlResult<SparqlQuery> {
        let slice = |pattern: &GraphPattern| GraphPattern::Slice {
            inner: Box::new(pattern.clone()),
            start: offset,
            length: Some(limit),
        };
        let query = match &self.query {
            Query::Select {
                dataset,
                pattern,
                base_iri,
            } => Query::Select {
                dataset: dataset.clone(),
                pattern: slice(pattern),
                base_iri: base_iri.clone(),
            },
            Query::Construct {
                template,
                dataset,
                pattern,
                base_iri,
            } => Query::Construct {
                template: template.clone(),
                dataset: dataset.clone(),
                pattern: slice(pattern),
                base_iri: base_iri.clone(),
            },
            _ => {
                return Err(SparqlError::Malformed(
                    "only SELECT and CONSTRUCT queries can be paginated".to_string(),
                ))
            }
        };
        Ok(Self { query })
    }

    /// SELECT query counting the solutions of this one into `?count`
    pub fn count_query(&self) -> SparqlResult<SparqlQuery> {
        match &self.query {
            Query::Select {
                dataset,
                pattern,
                base_iri,
            } => {
                let count = Variable::new_unchecked(COUNT_VARIABLE);
                let grouped = GraphPattern::Group {
                    inner: Box::new(pattern.clone()),
                    variables: Vec::new(),
                    aggregates: vec![(
                        count.clone(),
                        AggregateExpression::CountSolutions { distinct: false },
                    )],
                };
                Ok(Self {
                    query: Query::Select {
                        dataset: dataset.clone(),
                        pattern: GraphPattern::Project {
                            inner: Box::new(grouped),
                            variables: vec![count],
                        },
                        base_iri: base_iri.clone(),
                    },
                })
            }
            _ => Err(SparqlError::Malformed(
                "only SELECT queries can be counted".to_string(),
            )),
        }
    }
}

impl fmt::Display for SparqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query)
    }
}
