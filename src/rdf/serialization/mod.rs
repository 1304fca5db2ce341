//! RDF serialization formats
//!
//! Bulk ingestion of RDF documents into quads. Supports:
//! - Turtle (TTL)
//! - N-Triples (NT)
//! - N-Quads (NQ)
//! - TriG
//! - RDF/XML

mod parser;

pub use parser::RdfParser;

use std::path::Path;
use thiserror::Error;

/// RDF serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    /// Turtle format (.ttl)
    Turtle,
    /// N-Triples format (.nt)
    NTriples,
    /// N-Quads format (.nq)
    NQuads,
    /// TriG format (.trig)
    TriG,
    /// RDF/XML format (.rdf, .owl)
    RdfXml,
}

impl RdfFormat {
    /// Guess the format from a file extension
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "ttl" => Some(RdfFormat::Turtle),
            "nt" => Some(RdfFormat::NTriples),
            "nq" => Some(RdfFormat::NQuads),
            "trig" => Some(RdfFormat::TriG),
            "rdf" | "owl" | "xml" => Some(RdfFormat::RdfXml),
            _ => None,
        }
    }

    /// Guess the format from a file name
    pub fn from_path(path: &Path) -> ParseResult<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| ParseError::UnknownFormat(path.display().to_string()))
    }
}

/// Parse errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// No RDF format matches the file name
    #[error("File should be in a valid RDF format; cannot determine one from {0}")]
    UnknownFormat(String),
}

pub type ParseResult<T> = Result<T, ParseError>;
