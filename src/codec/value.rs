//! Typed field values carried by entity instances

use super::calendar::XsdCalendar;
use crate::mapping::{EntityRef, LazyEntity};
use crate::rdf::NamedNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a field, used as the decode target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    Calendar,
    Iri,
    Entity,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "String",
            ValueKind::Integer => "Integer",
            ValueKind::Float => "Float",
            ValueKind::Boolean => "Boolean",
            ValueKind::DateTime => "DateTime",
            ValueKind::Calendar => "Calendar",
            ValueKind::Iri => "Iri",
            ValueKind::Entity => "Entity",
        };
        f.write_str(name)
    }
}

/// Value of one entity field
#[derive(Debug, Clone, Default)]
pub enum FieldValue {
    /// Unset
    #[default]
    Null,
    String(String),
    /// String read from, or destined for, a language-tagged literal
    LangString { value: String, language: String },
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    /// Partial calendar value (gYear, gYearMonth, date, ...)
    Calendar(XsdCalendar),
    /// Resource reference
    Iri(NamedNode),
    /// Loaded related entity
    Entity(EntityRef),
    /// Related entity resolved on first access
    Lazy(LazyEntity),
    /// Collection-valued field
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn lang_string(value: impl Into<String>, language: impl Into<String>) -> Self {
        FieldValue::LangString {
            value: value.into(),
            language: language.into(),
        }
    }

    /// Get type name
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "Null",
            FieldValue::String(_) => "String",
            FieldValue::LangString { .. } => "LangString",
            FieldValue::Integer(_) => "Integer",
            FieldValue::Float(_) => "Float",
            FieldValue::Boolean(_) => "Boolean",
            FieldValue::DateTime(_) => "DateTime",
            FieldValue::Calendar(_) => "Calendar",
            FieldValue::Iri(_) => "Iri",
            FieldValue::Entity(_) => "Entity",
            FieldValue::Lazy(_) => "Lazy",
            FieldValue::List(_) => "List",
        }
    }

    /// Text of a plain or language-tagged string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            FieldValue::LangString { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            FieldValue::LangString { language, .. } => Some(language),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<&DateTime<Utc>> {
        match self {
            FieldValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_calendar(&self) -> Option<&XsdCalendar> {
        match self {
            FieldValue::Calendar(c) => Some(c),
            _ => None,
        }
    }

    /// Referenced resource of an IRI or a lazy reference
    pub fn as_iri(&self) -> Option<&NamedNode> {
        match self {
            FieldValue::Iri(n) => Some(n),
            FieldValue::Lazy(l) => Some(l.id()),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            FieldValue::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_lazy(&self) -> Option<&LazyEntity> {
        match self {
            FieldValue::Lazy(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Individual values: the items of a list, nothing for null, else the value itself
    pub fn items(&self) -> Vec<&FieldValue> {
        match self {
            FieldValue::Null => Vec::new(),
            FieldValue::List(items) => items.iter().filter(|v| !v.is_null()).collect(),
            other => vec![other],
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (
                FieldValue::LangString { value: a, language: la },
                FieldValue::LangString { value: b, language: lb },
            ) => a == b && la.eq_ignore_ascii_case(lb),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a == b,
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => a == b,
            (FieldValue::Calendar(a), FieldValue::Calendar(b)) => a == b,
            (FieldValue::Iri(a), FieldValue::Iri(b)) => a == b,
            (FieldValue::Entity(a), FieldValue::Entity(b)) => a.ptr_eq(b),
            (FieldValue::Lazy(a), FieldValue::Lazy(b)) => a.id() == b.id(),
            (FieldValue::List(a), FieldValue::List(b)) => a == b,
            _ => false,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Integer(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(dt: DateTime<Utc>) -> Self {
        FieldValue::DateTime(dt)
    }
}

impl From<XsdCalendar> for FieldValue {
    fn from(c: XsdCalendar) -> Self {
        FieldValue::Calendar(c)
    }
}

impl From<NamedNode> for FieldValue {
    fn from(n: NamedNode) -> Self {
        FieldValue::Iri(n)
    }
}

impl From<EntityRef> for FieldValue {
    fn from(e: EntityRef) -> Self {
        FieldValue::Entity(e)
    }
}

impl From<LazyEntity> for FieldValue {
    fn from(l: LazyEntity) -> Self {
        FieldValue::Lazy(l)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        FieldValue::List(items)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}
