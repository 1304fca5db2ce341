//! Value codec
//!
//! Converts typed field values to RDF objects (literals or resources) and back.
//!
//! Encoding picks the literal form from, in order: the value's own language
//! tag, a declared language tag, a declared datatype, then the natural XSD
//! datatype of the value. Tagged literals decode to strings that keep their
//! tag, so writing a loaded value back reproduces the stored literal. Decoding
//! checks the literal against the declared datatype before parsing it as the
//! target kind.

mod calendar;
mod value;

pub use calendar::{CalendarPrecision, XsdCalendar};
pub use value::{FieldValue, ValueKind};

use crate::rdf::vocab::xsd;
use crate::rdf::{is_absolute_iri, Literal, NamedNode, RdfObject};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use thiserror::Error;

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Lexical form cannot be read as the target kind
    #[error("Cannot decode '{lexical}' as {target}")]
    InvalidLexical { lexical: String, target: ValueKind },

    /// Literal datatype differs from the declared one
    #[error("Datatype mismatch: expected <{expected}>, found <{found}>")]
    DatatypeMismatch { expected: String, found: String },

    /// Value has no literal form
    #[error("Cannot encode {0} value as an RDF term")]
    Unencodable(&'static str),

    /// Malformed literal (bad language tag, bad IRI)
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Literal/resource codec
pub struct ValueCodec;

impl ValueCodec {
    /// Encode a field value as an RDF object
    pub fn encode(
        value: &FieldValue,
        datatype: Option<&NamedNode>,
        language: Option<&str>,
    ) -> CodecResult<RdfObject> {
        let typed = |lexical: String, default: &str| -> CodecResult<RdfObject> {
            let dt = match datatype {
                Some(dt) => dt.clone(),
                None => named(default)?,
            };
            Ok(RdfObject::Literal(Literal::new_typed_literal(lexical, dt)))
        };

        match value {
            FieldValue::String(s) => {
                if let Some(lang) = language {
                    let lit = Literal::new_language_tagged_literal(s.as_str(), lang)
                        .map_err(|e| CodecError::InvalidLiteral(e.to_string()))?;
                    Ok(RdfObject::Literal(lit))
                } else if let Some(dt) = datatype {
                    Ok(RdfObject::Literal(Literal::new_typed_literal(
                        s.as_str(),
                        dt.clone(),
                    )))
                } else {
                    Ok(RdfObject::Literal(Literal::new_simple_literal(s.as_str())))
                }
            }
            FieldValue::LangString { value, language } => {
                Literal::new_language_tagged_literal(value.as_str(), language.as_str())
                    .map(RdfObject::Literal)
                    .map_err(|e| CodecError::InvalidLiteral(e.to_string()))
            }
            FieldValue::Integer(i) => typed(i.to_string(), xsd::LONG),
            FieldValue::Float(f) => typed(format_double(*f), xsd::DOUBLE),
            FieldValue::Boolean(b) => typed(b.to_string(), xsd::BOOLEAN),
            FieldValue::DateTime(dt) => {
                if datatype.map(|d| d.as_str()) == Some(xsd::DATE) {
                    typed(dt.format("%Y-%m-%d").to_string(), xsd::DATE)
                } else {
                    typed(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true), xsd::DATE_TIME)
                }
            }
            FieldValue::Calendar(c) => match datatype {
                Some(declared) if declared.as_str() != c.datatype() => {
                    Err(CodecError::DatatypeMismatch {
                        expected: declared.as_str().to_string(),
                        found: c.datatype().to_string(),
                    })
                }
                _ => typed(c.to_lexical(), c.datatype()),
            },
            FieldValue::Iri(n) => {
                if datatype.map(|d| d.as_str()) == Some(xsd::ANY_URI) {
                    typed(n.as_str().to_string(), xsd::ANY_URI)
                } else {
                    Ok(RdfObject::NamedNode(n.clone()))
                }
            }
            FieldValue::Lazy(l) => Ok(RdfObject::NamedNode(l.id().clone())),
            other => Err(CodecError::Unencodable(other.type_name())),
        }
    }

    /// Decode an RDF object as a value of kind `target`
    pub fn decode(
        object: &RdfObject,
        target: ValueKind,
        datatype: Option<&NamedNode>,
    ) -> CodecResult<FieldValue> {
        let literal = match object {
            RdfObject::Literal(lit) => {
                if let Some(expected) = datatype {
                    let found = lit.datatype();
                    if &found != expected {
                        return Err(CodecError::DatatypeMismatch {
                            expected: expected.as_str().to_string(),
                            found: found.as_str().to_string(),
                        });
                    }
                }
                lit
            }
            RdfObject::NamedNode(n) => {
                return match target {
                    ValueKind::Iri | ValueKind::Entity => Ok(FieldValue::Iri(n.clone())),
                    ValueKind::String => Ok(FieldValue::String(n.as_str().to_string())),
                    _ => Err(invalid(n.as_str(), target)),
                };
            }
            RdfObject::BlankNode(b) => return Err(invalid(b.as_str(), target)),
        };

        let lexical = literal.value();
        let trimmed = lexical.trim();
        match target {
            ValueKind::String => Ok(match literal.language() {
                Some(language) => FieldValue::lang_string(lexical, language),
                None => FieldValue::String(lexical.to_string()),
            }),
            ValueKind::Integer => trimmed
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| invalid(lexical, target)),
            ValueKind::Float => parse_double(trimmed)
                .map(FieldValue::Float)
                .ok_or_else(|| invalid(lexical, target)),
            ValueKind::Boolean => match trimmed {
                "true" | "1" => Ok(FieldValue::Boolean(true)),
                "false" | "0" => Ok(FieldValue::Boolean(false)),
                _ => Err(invalid(lexical, target)),
            },
            ValueKind::DateTime => parse_date_time(trimmed)
                .map(FieldValue::DateTime)
                .ok_or_else(|| invalid(lexical, target)),
            ValueKind::Calendar => XsdCalendar::parse(trimmed).map(FieldValue::Calendar),
            ValueKind::Iri | ValueKind::Entity => {
                if is_absolute_iri(trimmed) {
                    named(trimmed).map(FieldValue::Iri)
                } else {
                    Err(invalid(lexical, target))
                }
            }
        }
    }
}

fn invalid(lexical: &str, target: ValueKind) -> CodecError {
    CodecError::InvalidLexical {
        lexical: lexical.to_string(),
        target,
    }
}

fn named(iri: &str) -> CodecResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| CodecError::InvalidLiteral(e.to_string()))
}

fn format_double(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        format!("{:?}", f)
    }
}

fn parse_double(s: &str) -> Option<f64> {
    match s {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        // Rust accepts "inf"/"infinity" spellings that XSD does not
        _ if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        _ => s.parse::<f64>().ok(),
    }
}

fn parse_date_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = s.strip_suffix('Z').unwrap_or(s);
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
