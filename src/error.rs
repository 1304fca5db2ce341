//! Crate-level error taxonomy
//!
//! Module errors are routed into [`SemanticError`], the error returned by the
//! database façade and the entity template.

use crate::codec::CodecError;
use crate::mapping::MappingError;
use crate::sparql::SparqlError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced to callers of mapping operations
#[derive(Error, Debug)]
pub enum SemanticError {
    /// Encode/decode or field assignment failed
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// The store produced no result, or one of an unexpected shape
    #[error("Query evaluation error: {0}")]
    QueryEvaluation(String),

    /// Caller-supplied query is structurally invalid
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// Statement store failure
    #[error("Store access error: {0}")]
    StoreAccess(String),
}

pub type SemanticResult<T> = Result<T, SemanticError>;

impl SemanticError {
    /// True when the failure is a literal codec error
    pub fn is_codec_error(&self) -> bool {
        matches!(self, SemanticError::Mapping(MappingError::Codec(_)))
    }
}

impl From<CodecError> for SemanticError {
    fn from(err: CodecError) -> Self {
        SemanticError::Mapping(MappingError::Codec(err))
    }
}

impl From<SparqlError> for SemanticError {
    fn from(err: SparqlError) -> Self {
        match err {
            SparqlError::Malformed(msg) => SemanticError::MalformedQuery(msg),
            SparqlError::Unsupported(msg) => SemanticError::QueryEvaluation(msg),
        }
    }
}

impl From<StoreError> for SemanticError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Query(e) => e.into(),
            other => SemanticError::StoreAccess(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ValueKind;
    use crate::rdf::ParseError;

    #[test]
    fn test_codec_is_mapping_subtype() {
        let err: SemanticError = CodecError::InvalidLexical {
            lexical: "abc".to_string(),
            target: ValueKind::Integer,
        }
        .into();
        assert!(err.is_codec_error());
        assert!(matches!(err, SemanticError::Mapping(_)));

        let err: SemanticError = MappingError::UnknownType("Beer".to_string()).into();
        assert!(!err.is_codec_error());
    }

    #[test]
    fn test_store_errors_are_routed() {
        let err: SemanticError = StoreError::Access("disk gone".to_string()).into();
        assert!(matches!(err, SemanticError::StoreAccess(_)));

        let err: SemanticError = StoreError::ConnectionLimit(2).into();
        assert!(matches!(err, SemanticError::StoreAccess(_)));

        let err: SemanticError = StoreError::Ingest(ParseError::Parse("bad".to_string())).into();
        assert!(matches!(err, SemanticError::StoreAccess(_)));

        let err: SemanticError =
            StoreError::Query(SparqlError::Malformed("SELECT".to_string())).into();
        assert!(matches!(err, SemanticError::MalformedQuery(_)));

        let err: SemanticError =
            StoreError::Query(SparqlError::Unsupported("MINUS".to_string())).into();
        assert!(matches!(err, SemanticError::QueryEvaluation(_)));
    }
}
