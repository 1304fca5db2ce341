//! RDF terms and quads
//!
//! Nodes and literals wrap the oxrdf primitives and print in N-Quads syntax.
//! Every statement is a quad; `graph: None` is the default graph.

use oxrdf::{
    BlankNode as OxBlankNode, Literal as OxLiteral, NamedNode as OxNamedNode,
};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// RDF errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RdfError {
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    #[error("Invalid blank node: {0}")]
    InvalidBlankNode(String),

    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),
}

pub type RdfResult<T> = Result<T, RdfError>;

/// Newtype over an oxrdf value: conversions both ways and N-Quads display
macro_rules! ox_newtype {
    ($name:ident, $ox:ty) => {
        impl From<$ox> for $name {
            fn from(inner: $ox) -> Self {
                Self(inner)
            }
        }

        impl From<$name> for $ox {
            fn from(outer: $name) -> Self {
                outer.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

/// IRI-identified resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedNode(OxNamedNode);

ox_newtype!(NamedNode, OxNamedNode);

impl NamedNode {
    /// Validate and wrap an absolute IRI
    pub fn new(iri: impl Into<String>) -> RdfResult<Self> {
        let iri = iri.into();
        OxNamedNode::new(iri.as_str())
            .map(Self)
            .map_err(|e| RdfError::InvalidIri(format!("{}: {}", iri, e)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The wrapped oxrdf node
    pub fn inner(&self) -> &OxNamedNode {
        &self.0
    }
}

impl AsRef<str> for NamedNode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for NamedNode {
    type Err = RdfError;

    fn from_str(iri: &str) -> RdfResult<Self> {
        Self::new(iri)
    }
}

/// Anonymous resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlankNode(OxBlankNode);

ox_newtype!(BlankNode, OxBlankNode);

impl BlankNode {
    /// Fresh node with a random identifier
    pub fn new() -> Self {
        Self(OxBlankNode::default())
    }

    /// Node with a given identifier, as read from a document
    pub fn from_id(id: &str) -> RdfResult<Self> {
        OxBlankNode::new(id)
            .map(Self)
            .map_err(|e| RdfError::InvalidBlankNode(format!("{}: {}", id, e)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for BlankNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Literal with a datatype or a language tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal(OxLiteral);

ox_newtype!(Literal, OxLiteral);

impl Literal {
    /// `xsd:string` literal
    pub fn new_simple_literal(value: impl Into<String>) -> Self {
        Self(OxLiteral::new_simple_literal(value))
    }

    /// `rdf:langString` literal; the tag is validated
    pub fn new_language_tagged_literal(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> RdfResult<Self> {
        let language = language.into();
        OxLiteral::new_language_tagged_literal(value, language.as_str())
            .map(Self)
            .map_err(|e| RdfError::InvalidLiteral(format!("@{}: {}", language, e)))
    }

    pub fn new_typed_literal(value: impl Into<String>, datatype: NamedNode) -> Self {
        Self(OxLiteral::new_typed_literal(value, datatype.0))
    }

    /// Lexical form
    pub fn value(&self) -> &str {
        self.0.value()
    }

    pub fn language(&self) -> Option<&str> {
        self.0.language()
    }

    /// Datatype; `rdf:langString` for tagged literals
    pub fn datatype(&self) -> NamedNode {
        NamedNode(self.0.datatype().into_owned())
    }
}

/// Subject position: IRI or blank node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfSubject {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
}

/// Predicate position: always an IRI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RdfPredicate(NamedNode);

/// Object position: any term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfObject {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
}

/// Any term; the value type of query bindings
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfTerm {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
}

/// `From` impls lifting each variant payload into a term enum
macro_rules! variant_from {
    ($target:ident: $($variant:ident),+) => {
        $(
            impl From<$variant> for $target {
                fn from(value: $variant) -> Self {
                    $target::$variant(value)
                }
            }
        )+
    };
}

variant_from!(RdfSubject: NamedNode, BlankNode);
variant_from!(RdfObject: NamedNode, BlankNode, Literal);
variant_from!(RdfTerm: NamedNode, BlankNode, Literal);

/// Display by delegating to the variant payload
macro_rules! display_variants {
    ($target:ident: $($variant:ident),+) => {
        impl fmt::Display for $target {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($target::$variant(inner) => fmt::Display::fmt(inner, f),)+
                }
            }
        }
    };
}

display_variants!(RdfSubject: NamedNode, BlankNode);
display_variants!(RdfObject: NamedNode, BlankNode, Literal);
display_variants!(RdfTerm: NamedNode, BlankNode, Literal);

impl RdfSubject {
    pub fn is_named_node(&self) -> bool {
        self.as_named_node().is_some()
    }

    pub fn as_named_node(&self) -> Option<&NamedNode> {
        match self {
            RdfSubject::NamedNode(n) => Some(n),
            RdfSubject::BlankNode(_) => None,
        }
    }
}

impl RdfPredicate {
    pub fn new(iri: impl Into<String>) -> RdfResult<Self> {
        NamedNode::new(iri).map(Self)
    }

    pub fn as_named_node(&self) -> &NamedNode {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RdfPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<NamedNode> for RdfPredicate {
    fn from(node: NamedNode) -> Self {
        Self(node)
    }
}

impl From<RdfPredicate> for NamedNode {
    fn from(predicate: RdfPredicate) -> Self {
        predicate.0
    }
}

impl RdfObject {
    pub fn is_named_node(&self) -> bool {
        self.as_named_node().is_some()
    }

    pub fn is_literal(&self) -> bool {
        self.as_literal().is_some()
    }

    pub fn as_named_node(&self) -> Option<&NamedNode> {
        match self {
            RdfObject::NamedNode(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            RdfObject::Literal(l) => Some(l),
            _ => None,
        }
    }
}

impl From<RdfSubject> for RdfObject {
    fn from(subject: RdfSubject) -> Self {
        RdfTerm::from(subject).into()
    }
}

impl RdfTerm {
    /// IRI, blank node id or literal value
    pub fn lexical(&self) -> &str {
        match self {
            RdfTerm::NamedNode(n) => n.as_str(),
            RdfTerm::BlankNode(b) => b.as_str(),
            RdfTerm::Literal(l) => l.value(),
        }
    }

    /// The term as a subject; literals cannot be one
    pub fn to_subject(&self) -> Option<RdfSubject> {
        match self {
            RdfTerm::NamedNode(n) => Some(n.clone().into()),
            RdfTerm::BlankNode(b) => Some(b.clone().into()),
            RdfTerm::Literal(_) => None,
        }
    }
}

impl From<RdfSubject> for RdfTerm {
    fn from(subject: RdfSubject) -> Self {
        match subject {
            RdfSubject::NamedNode(n) => n.into(),
            RdfSubject::BlankNode(b) => b.into(),
        }
    }
}

impl From<RdfObject> for RdfTerm {
    fn from(object: RdfObject) -> Self {
        match object {
            RdfObject::NamedNode(n) => n.into(),
            RdfObject::BlankNode(b) => b.into(),
            RdfObject::Literal(l) => l.into(),
        }
    }
}

impl From<RdfTerm> for RdfObject {
    fn from(term: RdfTerm) -> Self {
        match term {
            RdfTerm::NamedNode(n) => n.into(),
            RdfTerm::BlankNode(b) => b.into(),
            RdfTerm::Literal(l) => l.into(),
        }
    }
}

/// Statement in a named graph, or in the default graph when `graph` is `None`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    pub subject: RdfSubject,
    pub predicate: RdfPredicate,
    pub object: RdfObject,
    pub graph: Option<NamedNode>,
}

impl Quad {
    pub fn new(
        subject: impl Into<RdfSubject>,
        predicate: impl Into<RdfPredicate>,
        object: impl Into<RdfObject>,
        graph: Option<NamedNode>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            graph,
        }
    }

    /// Statement in the default graph
    pub fn triple(
        subject: impl Into<RdfSubject>,
        predicate: impl Into<RdfPredicate>,
        object: impl Into<RdfObject>,
    ) -> Self {
        Self::new(subject, predicate, object, None)
    }
}

/// One N-Quads line
impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(graph) = &self.graph {
            write!(f, " {}", graph)?;
        }
        f.write_str(" .")
    }
}

/// Statement lookup; unset positions match anything
///
/// `graph` distinguishes "any graph" (`None`) from "the default graph"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuadPattern {
    pub subject: Option<RdfSubject>,
    pub predicate: Option<RdfPredicate>,
    pub object: Option<RdfObject>,
    pub graph: Option<Option<NamedNode>>,
}

impl QuadPattern {
    /// Pattern from optional positions; a `None` context matches every graph
    pub fn new(
        subject: Option<RdfSubject>,
        predicate: Option<RdfPredicate>,
        object: Option<RdfObject>,
        context: Option<NamedNode>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph: context.map(Some),
        }
    }

    pub fn subject(subject: impl Into<RdfSubject>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..Self::default()
        }
    }

    pub fn object(object: impl Into<RdfObject>) -> Self {
        Self {
            object: Some(object.into()),
            ..Self::default()
        }
    }

    pub fn with_predicate(mut self, predicate: impl Into<RdfPredicate>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_object(mut self, object: impl Into<RdfObject>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn matches(&self, quad: &Quad) -> bool {
        fn bound<T: PartialEq>(wanted: &Option<T>, actual: &T) -> bool {
            wanted.as_ref().map_or(true, |w| w == actual)
        }
        bound(&self.subject, &quad.subject)
            && bound(&self.predicate, &quad.predicate)
            && bound(&self.object, &quad.object)
            && bound(&self.graph, &quad.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINE: &str = "http://example.org/wine#";

    fn node(local: &str) -> NamedNode {
        NamedNode::new(format!("{}{}", WINE, local)).unwrap()
    }

    #[test]
    fn test_named_node_validation() {
        let merlot: NamedNode = "http://example.org/wine#merlot".parse().unwrap();
        assert_eq!(merlot, node("merlot"));
        assert_eq!(merlot.to_string(), "<http://example.org/wine#merlot>");

        let err = NamedNode::new("merlot").unwrap_err();
        assert!(matches!(err, RdfError::InvalidIri(ref msg) if msg.starts_with("merlot")));
    }

    #[test]
    fn test_literal_forms() {
        let plain = Literal::new_simple_literal("Merlot");
        assert_eq!(plain.datatype().as_str(), "http://www.w3.org/2001/XMLSchema#string");
        assert_eq!(plain.language(), None);

        let tagged = Literal::new_language_tagged_literal("Rouge", "fr").unwrap();
        assert_eq!(tagged.language(), Some("fr"));
        assert_eq!(
            tagged.datatype().as_str(),
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString"
        );
        assert!(Literal::new_language_tagged_literal("x", "not a tag").is_err());

        let year = Literal::new_typed_literal(
            "1996",
            NamedNode::new("http://www.w3.org/2001/XMLSchema#gYear").unwrap(),
        );
        assert_eq!(year.value(), "1996");
    }

    #[test]
    fn test_pattern_positions() {
        let cellar = node("cellar");
        let quad = Quad::new(
            node("merlot"),
            node("name"),
            Literal::new_simple_literal("Merlot"),
            Some(cellar.clone()),
        );

        assert!(QuadPattern::default().matches(&quad));
        assert!(QuadPattern::subject(node("merlot"))
            .with_predicate(node("name"))
            .matches(&quad));
        assert!(!QuadPattern::subject(node("syrah")).matches(&quad));
        assert!(QuadPattern::object(Literal::new_simple_literal("Merlot")).matches(&quad));
        assert!(QuadPattern::new(None, None, None, Some(cellar)).matches(&quad));

        let default_graph = QuadPattern {
            graph: Some(None),
            ..QuadPattern::default()
        };
        assert!(!default_graph.matches(&quad));
        assert!(default_graph.matches(&Quad::triple(
            node("merlot"),
            node("name"),
            Literal::new_simple_literal("Merlot"),
        )));
    }

    #[test]
    fn test_nquads_display() {
        let quad = Quad::new(
            node("merlot"),
            node("maker"),
            node("margaux"),
            Some(node("cellar")),
        );
        assert_eq!(
            quad.to_string(),
            "<http://example.org/wine#merlot> <http://example.org/wine#maker> \
             <http://example.org/wine#margaux> <http://example.org/wine#cellar> ."
        );
    }

    #[test]
    fn test_term_conversions() {
        let merlot = node("merlot");
        let term = RdfTerm::from(RdfSubject::from(merlot.clone()));
        assert_eq!(term.lexical(), merlot.as_str());
        assert_eq!(term.to_subject(), Some(RdfSubject::NamedNode(merlot.clone())));
        assert_eq!(RdfObject::from(term).as_named_node(), Some(&merlot));

        let literal = RdfTerm::from(Literal::new_simple_literal("Merlot"));
        assert_eq!(literal.to_subject(), None);
        assert!(RdfObject::from(literal).is_literal());
    }
}
