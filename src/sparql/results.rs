//! Answers produced by query evaluation

use crate::rdf::{Quad, RdfTerm};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// One row of a SELECT answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySolution {
    pub bindings: HashMap<String, RdfTerm>,
}

impl QuerySolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, variable: &str) -> Option<&RdfTerm> {
        self.bindings.get(variable)
    }

    /// Bind `variable`, replacing an earlier binding of the same name
    pub fn bind(&mut self, variable: impl Into<String>, term: RdfTerm) {
        self.bindings.insert(variable.into(), term);
    }

    /// Bound variable names
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Order-independent key usable for de-duplication
    pub(crate) fn key(&self) -> Vec<(String, RdfTerm)> {
        let mut key: Vec<(String, RdfTerm)> = self
            .bindings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        key.sort_by(|a, b| a.0.cmp(&b.0));
        key
    }
}

/// Answer of a SELECT, ASK or CONSTRUCT query
#[derive(Debug, Clone, PartialEq)]
pub enum SparqlResults {
    /// SELECT rows with the projected variables in order
    Bindings {
        variables: Vec<String>,
        solutions: Vec<QuerySolution>,
    },

    /// ASK
    Boolean(bool),

    /// CONSTRUCT
    Graph(Vec<Quad>),
}

impl SparqlResults {
    /// SELECT answer with no variables and no rows
    pub fn empty() -> Self {
        SparqlResults::Bindings {
            variables: Vec::new(),
            solutions: Vec::new(),
        }
    }

    /// Number of solutions, statements, or 1 for a boolean
    pub fn len(&self) -> usize {
        match self {
            SparqlResults::Bindings { solutions, .. } => solutions.len(),
            SparqlResults::Boolean(_) => 1,
            SparqlResults::Graph(quads) => quads.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Solutions of a SELECT result
    pub fn solutions(&self) -> &[QuerySolution] {
        match self {
            SparqlResults::Bindings { solutions, .. } => solutions,
            _ => &[],
        }
    }

    /// Projected variables of a SELECT result
    pub fn variables(&self) -> &[String] {
        match self {
            SparqlResults::Bindings { variables, .. } => variables,
            _ => &[],
        }
    }

    /// Statements of a CONSTRUCT result
    pub fn into_quads(self) -> Vec<Quad> {
        match self {
            SparqlResults::Graph(quads) => quads,
            _ => Vec::new(),
        }
    }

    /// SPARQL 1.1 JSON results document; graphs are rendered as N-Quads lines
    pub fn to_json(&self) -> Value {
        match self {
            SparqlResults::Bindings {
                variables,
                solutions,
            } => {
                let rows: Vec<Value> = solutions
                    .iter()
                    .map(|solution| {
                        let mut row = Map::new();
                        for (name, term) in &solution.bindings {
                            row.insert(name.clone(), term_to_json(term));
                        }
                        Value::Object(row)
                    })
                    .collect();
                json!({
                    "head": { "vars": variables },
                    "results": { "bindings": rows }
                })
            }
            SparqlResults::Boolean(b) => json!({ "head": {}, "boolean": b }),
            SparqlResults::Graph(quads) => {
                Value::Array(quads.iter().map(|q| Value::String(q.to_string())).collect())
            }
        }
    }
}

fn term_to_json(term: &RdfTerm) -> Value {
    match term {
        RdfTerm::NamedNode(n) => json!({ "type": "uri", "value": n.as_str() }),
        RdfTerm::BlankNode(b) => json!({ "type": "bnode", "value": b.as_str() }),
        RdfTerm::Literal(l) => match l.language() {
            Some(lang) => json!({ "type": "literal", "value": l.value(), "xml:lang": lang }),
            None => json!({
                "type": "literal",
                "value": l.value(),
                "datatype": l.datatype().as_str()
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Literal, NamedNode};

    #[test]
    fn test_solution_rebinding() {
        let mut row = QuerySolution::default();
        assert!(row.is_empty());

        row.bind("name", RdfTerm::Literal(Literal::new_simple_literal("Merlot")));
        row.bind("name", RdfTerm::Literal(Literal::new_simple_literal("Syrah")));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("name").unwrap().lexical(), "Syrah");
        assert!(row.get("vintage").is_none());
    }

    #[test]
    fn test_accessors_on_other_kinds() {
        assert!(SparqlResults::empty().is_empty());
        let ask = SparqlResults::Boolean(false);
        assert_eq!(ask.len(), 1);
        assert!(ask.solutions().is_empty());
        assert!(ask.variables().is_empty());
        assert!(ask.into_quads().is_empty());
    }

    #[test]
    fn test_json_output() {
        let mut solution = QuerySolution::new();
        solution.bind(
            "s",
            RdfTerm::NamedNode(NamedNode::new("http://example.org/a").unwrap()),
        );
        let results = SparqlResults::Bindings {
            variables: vec!["s".to_string()],
            solutions: vec![solution],
        };
        let json = results.to_json();
        assert_eq!(json["head"]["vars"][0], "s");
        assert_eq!(json["results"]["bindings"][0]["s"]["type"], "uri");

        assert_eq!(SparqlResults::Boolean(true).to_json()["boolean"], true);
    }
}
