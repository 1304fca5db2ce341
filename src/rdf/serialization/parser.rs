//! rio-based parsers producing quads

use super::{ParseError, ParseResult, RdfFormat};
use crate::rdf::{BlankNode, Literal, NamedNode, Quad, RdfObject, RdfPredicate, RdfSubject};
use rio_api::model;
use rio_api::parser::{QuadsParser, TriplesParser};
use rio_turtle::{NQuadsParser, NTriplesParser, TriGParser, TurtleError, TurtleParser};
use rio_xml::{RdfXmlError, RdfXmlParser};
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

impl From<TurtleError> for ParseError {
    fn from(e: TurtleError) -> Self {
        ParseError::Parse(e.to_string())
    }
}

impl From<RdfXmlError> for ParseError {
    fn from(e: RdfXmlError) -> Self {
        ParseError::Parse(e.to_string())
    }
}

/// RDF parser
pub struct RdfParser;

impl RdfParser {
    /// Parse RDF data from a string
    pub fn parse(input: &str, format: RdfFormat) -> ParseResult<Vec<Quad>> {
        Self::parse_reader(BufReader::new(Cursor::new(input)), format)
    }

    /// Parse RDF data from a file; the format is taken from the file extension
    pub fn parse_file(path: &Path) -> ParseResult<Vec<Quad>> {
        let format = RdfFormat::from_path(path)?;
        let file = File::open(path)?;
        Self::parse_reader(BufReader::new(file), format)
    }

    /// Parse RDF data from a buffered reader
    pub fn parse_reader(reader: impl BufRead, format: RdfFormat) -> ParseResult<Vec<Quad>> {
        let mut quads = Vec::new();

        match format {
            RdfFormat::Turtle => {
                TurtleParser::new(reader, None).parse_all(&mut |t| {
                    quads.push(convert_triple(t)?);
                    Ok::<(), ParseError>(())
                })?;
            }
            RdfFormat::NTriples => {
                NTriplesParser::new(reader).parse_all(&mut |t| {
                    quads.push(convert_triple(t)?);
                    Ok::<(), ParseError>(())
                })?;
            }
            RdfFormat::RdfXml => {
                RdfXmlParser::new(reader, None).parse_all(&mut |t| {
                    quads.push(convert_triple(t)?);
                    Ok::<(), ParseError>(())
                })?;
            }
            RdfFormat::NQuads => {
                NQuadsParser::new(reader).parse_all(&mut |q| {
                    quads.push(convert_quad(q)?);
                    Ok::<(), ParseError>(())
                })?;
            }
            RdfFormat::TriG => {
                TriGParser::new(reader, None).parse_all(&mut |q| {
                    quads.push(convert_quad(q)?);
                    Ok::<(), ParseError>(())
                })?;
            }
        }

        Ok(quads)
    }
}

fn convert_triple(t: model::Triple<'_>) -> ParseResult<Quad> {
    Ok(Quad::new(
        convert_subject(t.subject)?,
        convert_predicate(t.predicate)?,
        convert_object(t.object)?,
        None,
    ))
}

fn convert_quad(q: model::Quad<'_>) -> ParseResult<Quad> {
    let graph = match q.graph_name {
        None => None,
        Some(model::GraphName::NamedNode(n)) => Some(named_node(n.iri)?),
        Some(model::GraphName::BlankNode(b)) => {
            return Err(ParseError::Parse(format!(
                "Blank node graph names are not supported: _:{}",
                b.id
            )))
        }
    };
    Ok(Quad::new(
        convert_subject(q.subject)?,
        convert_predicate(q.predicate)?,
        convert_object(q.object)?,
        graph,
    ))
}

fn named_node(iri: &str) -> ParseResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| ParseError::Parse(e.to_string()))
}

fn convert_subject(s: model::Subject<'_>) -> ParseResult<RdfSubject> {
    match s {
        model::Subject::NamedNode(n) => Ok(RdfSubject::NamedNode(named_node(n.iri)?)),
        model::Subject::BlankNode(b) => Ok(RdfSubject::BlankNode(
            BlankNode::from_id(b.id).map_err(|e| ParseError::Parse(e.to_string()))?,
        )),
        _ => Err(ParseError::Parse("Unsupported subject type".to_string())),
    }
}

fn convert_predicate(p: model::NamedNode<'_>) -> ParseResult<RdfPredicate> {
    RdfPredicate::new(p.iri).map_err(|e| ParseError::Parse(e.to_string()))
}

fn convert_object(o: model::Term<'_>) -> ParseResult<RdfObject> {
    match o {
        model::Term::NamedNode(n) => Ok(RdfObject::NamedNode(named_node(n.iri)?)),
        model::Term::BlankNode(b) => Ok(RdfObject::BlankNode(
            BlankNode::from_id(b.id).map_err(|e| ParseError::Parse(e.to_string()))?,
        )),
        model::Term::Literal(l) => match l {
            model::Literal::Simple { value } => {
                Ok(RdfObject::Literal(Literal::new_simple_literal(value)))
            }
            model::Literal::LanguageTaggedString { value, language } => Ok(RdfObject::Literal(
                Literal::new_language_tagged_literal(value, language)
                    .map_err(|e| ParseError::Parse(e.to_string()))?,
            )),
            model::Literal::Typed { value, datatype } => Ok(RdfObject::Literal(
                Literal::new_typed_literal(value, named_node(datatype.iri)?),
            )),
        },
        _ => Err(ParseError::Parse("Unsupported object type".to_string())),
    }
}
