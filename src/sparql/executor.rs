//! SPARQL query executor
//!
//! Evaluates the subset of the SPARQL algebra the mapping layer needs over any
//! [`QuadSource`]: basic graph patterns, joins, unions, `GRAPH`, projection,
//! `DISTINCT`/`REDUCED`, ordering by variables, slices, `BIND` of a variable
//! and `COUNT(*)` without `GROUP BY` keys. The default graph is the union of
//! all graphs.

use super::parser::SparqlQuery;
use super::results::{QuerySolution, SparqlResults};
use super::{SparqlError, SparqlResult};
use crate::rdf::{
    BlankNode, Literal, NamedNode, Quad, QuadPattern, RdfObject, RdfPredicate, RdfSubject,
    RdfTerm,
};
use indexmap::IndexSet;
use spargebra::algebra::{AggregateExpression, Expression, GraphPattern, OrderExpression};
use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};
use spargebra::Query;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Anything able to answer quad pattern lookups
pub trait QuadSource {
    /// Quads matching the pattern, in source order
    fn quads_for_pattern(&self, pattern: &QuadPattern) -> Vec<Quad>;
}

impl QuadSource for [Quad] {
    fn quads_for_pattern(&self, pattern: &QuadPattern) -> Vec<Quad> {
        self.iter().filter(|q| pattern.matches(q)).cloned().collect()
    }
}

/// Graph a pattern is evaluated against
#[derive(Debug, Clone)]
enum GraphScope {
    /// Union of all graphs
    Default,
    Named(NamedNode),
    /// `GRAPH ?g`: named graphs only, bound to the variable
    Variable(String),
}

/// SPARQL query executor
pub struct SparqlExecutor<'a, S: QuadSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: QuadSource + ?Sized> SparqlExecutor<'a, S> {
    /// Create a new executor
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Execute a parsed query
    pub fn execute(&self, query: &SparqlQuery) -> SparqlResult<SparqlResults> {
        match query.inner() {
            Query::Select {
                dataset, pattern, ..
            } => {
                if dataset.is_some() {
                    return Err(unsupported("FROM clauses"));
                }
                let solutions = self.eval(pattern, &GraphScope::Default)?;
                let mut variables = projected_variables(pattern);
                if variables.is_empty() {
                    let mut seen = IndexSet::new();
                    for solution in &solutions {
                        for name in solution.variables() {
                            seen.insert(name.to_string());
                        }
                    }
                    variables = seen.into_iter().collect();
                }
                Ok(SparqlResults::Bindings {
                    variables,
                    solutions,
                })
            }
            Query::Ask {
                dataset, pattern, ..
            } => {
                if dataset.is_some() {
                    return Err(unsupported("FROM clauses"));
                }
                let solutions = self.eval(pattern, &GraphScope::Default)?;
                Ok(SparqlResults::Boolean(!solutions.is_empty()))
            }
            Query::Construct {
                template,
                dataset,
                pattern,
                ..
            } => {
                if dataset.is_some() {
                    return Err(unsupported("FROM clauses"));
                }
                let solutions = self.eval(pattern, &GraphScope::Default)?;
                Ok(SparqlResults::Graph(construct(template, &solutions)))
            }
            Query::Describe { .. } => Err(unsupported("DESCRIBE queries")),
        }
    }

    fn eval(&self, pattern: &GraphPattern, scope: &GraphScope) -> SparqlResult<Vec<QuerySolution>> {
        match pattern {
            GraphPattern::Bgp { patterns } => Ok(self.eval_bgp(patterns, scope)),
            GraphPattern::Join { left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                Ok(join(&left, &right))
            }
            GraphPattern::Union { left, right } => {
                let mut solutions = self.eval(left, scope)?;
                solutions.extend(self.eval(right, scope)?);
                Ok(solutions)
            }
            GraphPattern::Graph { name, inner } => {
                let scope = match name {
                    NamedNodePattern::NamedNode(n) => GraphScope::Named(NamedNode::from(n.clone())),
                    NamedNodePattern::Variable(v) => GraphScope::Variable(v.as_str().to_string()),
                };
                self.eval(inner, &scope)
            }
            GraphPattern::Project { inner, variables } => {
                let keep: HashSet<&str> = variables.iter().map(|v| v.as_str()).collect();
                Ok(self
                    .eval(inner, scope)?
                    .into_iter()
                    .map(|mut solution| {
                        solution.bindings.retain(|k, _| keep.contains(k.as_str()));
                        solution
                    })
                    .collect())
            }
            GraphPattern::Distinct { inner } | GraphPattern::Reduced { inner } => {
                Ok(distinct(self.eval(inner, scope)?))
            }
            GraphPattern::Slice {
                inner,
                start,
                length,
            } => {
                let solutions = self.eval(inner, scope)?.into_iter().skip(*start);
                Ok(match length {
                    Some(length) => solutions.take(*length).collect(),
                    None => solutions.collect(),
                })
            }
            GraphPattern::OrderBy { inner, expression } => {
                let mut keys = Vec::with_capacity(expression.len());
                for order in expression {
                    keys.push(match order {
                        OrderExpression::Asc(Expression::Variable(v)) => (v.as_str(), false),
                        OrderExpression::Desc(Expression::Variable(v)) => (v.as_str(), true),
                        _ => return Err(unsupported("ORDER BY on expressions")),
                    });
                }
                let mut solutions = self.eval(inner, scope)?;
                solutions.sort_by(|a, b| {
                    for (name, descending) in &keys {
                        let ord = compare_terms(a.get(name), b.get(name));
                        let ord = if *descending { ord.reverse() } else { ord };
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                    Ordering::Equal
                });
                Ok(solutions)
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => {
                let source = match expression {
                    Expression::Variable(v) => v.as_str(),
                    _ => return Err(unsupported("BIND of expressions")),
                };
                Ok(self
                    .eval(inner, scope)?
                    .into_iter()
                    .map(|mut solution| {
                        if let Some(term) = solution.get(source).cloned() {
                            solution.bind(variable.as_str(), term);
                        }
                        solution
                    })
                    .collect())
            }
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => {
                if !variables.is_empty() {
                    return Err(unsupported("GROUP BY"));
                }
                let solutions = self.eval(inner, scope)?;
                let mut result = QuerySolution::new();
                for (variable, aggregate) in aggregates {
                    let count = match aggregate {
                        AggregateExpression::CountSolutions { distinct: true } => {
                            distinct(solutions.clone()).len()
                        }
                        AggregateExpression::CountSolutions { distinct: false } => solutions.len(),
                        _ => return Err(unsupported("aggregates other than COUNT(*)")),
                    };
                    result.bind(variable.as_str(), integer_literal(count));
                }
                Ok(vec![result])
            }
            other => Err(SparqlError::Unsupported(format!(
                "graph pattern {}",
                other
            ))),
        }
    }

    fn eval_bgp(&self, patterns: &[TriplePattern], scope: &GraphScope) -> Vec<QuerySolution> {
        let mut solutions = vec![QuerySolution::new()];
        for triple in patterns {
            let mut next = Vec::new();
            for solution in &solutions {
                let Some(pattern) = bind_pattern(triple, solution, scope) else {
                    continue;
                };
                for quad in self.source.quads_for_pattern(&pattern) {
                    if let Some(extended) = extend(solution, triple, &quad, scope) {
                        next.push(extended);
                    }
                }
            }
            solutions = next;
            if solutions.is_empty() {
                break;
            }
        }
        solutions
    }
}

fn unsupported(what: &str) -> SparqlError {
    SparqlError::Unsupported(what.to_string())
}

fn integer_literal(value: usize) -> RdfTerm {
    RdfTerm::Literal(Literal::from(oxrdf::Literal::new_typed_literal(
        value.to_string(),
        oxrdf::vocab::xsd::INTEGER,
    )))
}

fn blank_name(b: &spargebra::term::BlankNode) -> String {
    format!("_:{}", b.as_str())
}

/// Variable name carried by a term pattern, if any
fn term_variable(term: &TermPattern) -> Option<String> {
    match term {
        TermPattern::Variable(v) => Some(v.as_str().to_string()),
        TermPattern::BlankNode(b) => Some(blank_name(b)),
        _ => None,
    }
}

/// Quad pattern for a triple pattern under the bindings of `solution`;
/// `None` when the pattern can never match
fn bind_pattern(
    triple: &TriplePattern,
    solution: &QuerySolution,
    scope: &GraphScope,
) -> Option<QuadPattern> {
    let subject = match &triple.subject {
        TermPattern::NamedNode(n) => Some(RdfSubject::NamedNode(NamedNode::from(n.clone()))),
        TermPattern::Literal(_) => return None,
        other => match term_variable(other).and_then(|name| solution.get(&name).cloned()) {
            Some(term) => Some(term.to_subject()?),
            None if term_variable(other).is_some() => None,
            None => return None,
        },
    };

    let predicate = match &triple.predicate {
        NamedNodePattern::NamedNode(n) => Some(RdfPredicate::from(NamedNode::from(n.clone()))),
        NamedNodePattern::Variable(v) => match solution.get(v.as_str()) {
            Some(RdfTerm::NamedNode(n)) => Some(RdfPredicate::from(n.clone())),
            Some(_) => return None,
            None => None,
        },
    };

    let object = match &triple.object {
        TermPattern::NamedNode(n) => Some(RdfObject::NamedNode(NamedNode::from(n.clone()))),
        TermPattern::Literal(l) => Some(RdfObject::Literal(Literal::from(l.clone()))),
        other => match term_variable(other) {
            Some(name) => solution.get(&name).cloned().map(RdfObject::from),
            None => return None,
        },
    };

    let graph = match scope {
        GraphScope::Default => None,
        GraphScope::Named(g) => Some(Some(g.clone())),
        GraphScope::Variable(name) => match solution.get(name) {
            Some(RdfTerm::NamedNode(g)) => Some(Some(g.clone())),
            Some(_) => return None,
            None => None,
        },
    };

    Some(QuadPattern {
        subject,
        predicate,
        object,
        graph,
    })
}

/// Bind a term, failing when the variable already holds a different one
fn bind_checked(solution: &mut QuerySolution, name: String, term: RdfTerm) -> bool {
    match solution.get(&name) {
        Some(existing) => existing == &term,
        None => {
            solution.bind(name, term);
            true
        }
    }
}

fn extend(
    solution: &QuerySolution,
    triple: &TriplePattern,
    quad: &Quad,
    scope: &GraphScope,
) -> Option<QuerySolution> {
    let mut extended = solution.clone();
    if let Some(name) = term_variable(&triple.subject) {
        if !bind_checked(&mut extended, name, RdfTerm::from(quad.subject.clone())) {
            return None;
        }
    }
    if let NamedNodePattern::Variable(v) = &triple.predicate {
        let term = RdfTerm::NamedNode(quad.predicate.as_named_node().clone());
        if !bind_checked(&mut extended, v.as_str().to_string(), term) {
            return None;
        }
    }
    if let Some(name) = term_variable(&triple.object) {
        if !bind_checked(&mut extended, name, RdfTerm::from(quad.object.clone())) {
            return None;
        }
    }
    if let GraphScope::Variable(name) = scope {
        let graph = quad.graph.clone()?;
        if !bind_checked(&mut extended, name.clone(), RdfTerm::NamedNode(graph)) {
            return None;
        }
    }
    Some(extended)
}

fn compatible(a: &QuerySolution, b: &QuerySolution) -> bool {
    a.bindings
        .iter()
        .all(|(k, v)| b.get(k).map_or(true, |other| other == v))
}

fn join(left: &[QuerySolution], right: &[QuerySolution]) -> Vec<QuerySolution> {
    let mut joined = Vec::new();
    for l in left {
        for r in right {
            if compatible(l, r) {
                let mut merged = l.clone();
                for (k, v) in &r.bindings {
                    merged.bindings.entry(k.clone()).or_insert_with(|| v.clone());
                }
                joined.push(merged);
            }
        }
    }
    joined
}

fn distinct(solutions: Vec<QuerySolution>) -> Vec<QuerySolution> {
    let mut seen = HashSet::new();
    solutions
        .into_iter()
        .filter(|s| seen.insert(s.key()))
        .collect()
}

fn compare_terms(a: Option<&RdfTerm>, b: Option<&RdfTerm>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            if let (Ok(x), Ok(y)) = (a.lexical().parse::<f64>(), b.lexical().parse::<f64>()) {
                if let Some(ord) = x.partial_cmp(&y) {
                    return ord;
                }
            }
            a.lexical().cmp(b.lexical())
        }
    }
}

fn projected_variables(pattern: &GraphPattern) -> Vec<String> {
    match pattern {
        GraphPattern::Project { variables, .. } => {
            variables.iter().map(|v| v.as_str().to_string()).collect()
        }
        GraphPattern::Slice { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::OrderBy { inner, .. } => projected_variables(inner),
        _ => Vec::new(),
    }
}

fn construct(template: &[TriplePattern], solutions: &[QuerySolution]) -> Vec<Quad> {
    let mut quads = IndexSet::new();
    for solution in solutions {
        let mut blanks: HashMap<String, BlankNode> = HashMap::new();
        let mut instantiate = |term: &TermPattern| -> Option<RdfTerm> {
            match term {
                TermPattern::NamedNode(n) => Some(RdfTerm::NamedNode(NamedNode::from(n.clone()))),
                TermPattern::Literal(l) => Some(RdfTerm::Literal(Literal::from(l.clone()))),
                TermPattern::BlankNode(b) => Some(RdfTerm::BlankNode(
                    blanks.entry(b.as_str().to_string()).or_default().clone(),
                )),
                TermPattern::Variable(v) => solution.get(v.as_str()).cloned(),
                #[allow(unreachable_patterns)]
                _ => None,
            }
        };
        for triple in template {
            let subject = instantiate(&triple.subject).and_then(|t| t.to_subject());
            let predicate = match &triple.predicate {
                NamedNodePattern::NamedNode(n) => Some(NamedNode::from(n.clone())),
                NamedNodePattern::Variable(v) => match solution.get(v.as_str()) {
                    Some(RdfTerm::NamedNode(n)) => Some(n.clone()),
                    _ => None,
                },
            };
            let object = instantiate(&triple.object);
            if let (Some(s), Some(p), Some(o)) = (subject, predicate, object) {
                quads.insert(Quad::triple(s, p, RdfObject::from(o)));
            }
        }
    }
    quads.into_iter().collect()
}
