//! Prefixes and name resolution
//!
//! Mapping annotations name types and predicates as absolute IRIs, prefixed
//! names (`foaf:name`) or bare local names. [`NamespaceManager::resolve`]
//! turns any of these into an IRI.

use super::types::NamedNode;
use super::vocab;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrefixError {
    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),

    /// Name that resolves to no valid IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),
}

pub type PrefixResult<T> = Result<T, PrefixError>;

/// Prefix binding, as stored alongside the statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub prefix: String,
    pub iri: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            iri: iri.into(),
        }
    }
}

/// Prefixes every manager starts with
const WELL_KNOWN: &[(&str, &str)] = &[
    ("rdf", vocab::rdf::NAMESPACE),
    ("rdfs", vocab::rdfs::NAMESPACE),
    ("xsd", vocab::xsd::NAMESPACE),
    ("owl", vocab::owl::NAMESPACE),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("dcterms", "http://purl.org/dc/terms/"),
];

/// True for names carrying a scheme; false for names to resolve against a
/// namespace
pub fn is_absolute_iri(iri: &str) -> bool {
    oxiri::Iri::parse(iri).is_ok()
}

/// Prefix table used to resolve declared names
#[derive(Debug, Clone)]
pub struct NamespaceManager {
    prefixes: IndexMap<String, String>,
}

impl NamespaceManager {
    pub fn new() -> Self {
        Self {
            prefixes: WELL_KNOWN
                .iter()
                .map(|(prefix, iri)| (prefix.to_string(), iri.to_string()))
                .collect(),
        }
    }

    /// Bind a prefix; a later binding of the same prefix wins
    pub fn add_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    /// Expand `prefix:local`
    pub fn expand(&self, prefixed: &str) -> PrefixResult<String> {
        let (prefix, local) = prefixed
            .split_once(':')
            .ok_or_else(|| PrefixError::InvalidIri(prefixed.to_string()))?;
        let iri = self
            .prefixes
            .get(prefix)
            .ok_or_else(|| PrefixError::UnknownPrefix(prefix.to_string()))?;
        Ok(format!("{}{}", iri, local))
    }

    /// Shorten an IRI to `prefix:local` using the longest matching binding
    pub fn compact(&self, iri: &str) -> Option<String> {
        self.prefixes
            .iter()
            .filter(|(_, ns)| iri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .map(|(prefix, ns)| format!("{}:{}", prefix, &iri[ns.len()..]))
    }

    /// Resolve a declared name.
    ///
    /// Bound prefixes are expanded first, so `ex:thing` uses the `ex` binding
    /// even though it parses as an IRI with scheme `ex`. Other absolute IRIs
    /// are kept as they are; anything else is appended to `namespace`.
    pub fn resolve(&self, name: &str, namespace: &str) -> PrefixResult<NamedNode> {
        let iri = match self.expand(name) {
            Ok(expanded) => expanded,
            Err(_) if is_absolute_iri(name) => name.to_string(),
            Err(_) => format!("{}{}", namespace, name),
        };
        NamedNode::new(iri.as_str()).map_err(|_| PrefixError::InvalidIri(iri))
    }

    /// Bindings in registration order
    pub fn prefixes(&self) -> Vec<Namespace> {
        self.prefixes
            .iter()
            .map(|(prefix, iri)| Namespace::new(prefix.as_str(), iri.as_str()))
            .collect()
    }
}

impl Default for NamespaceManager {
    fn default() -> Self {
        Self::new()
    }
}
