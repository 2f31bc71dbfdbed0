//! Scalar values carried by filter conditions and produced by attribute access.
//! Comparison is deliberately loose (int vs float, entity vs bare key) to match the way a
//! relational backend coerces operands in a WHERE clause.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

/// Identity of a loaded entity: its kind plus primary key rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub kind: String,
    pub pk: String,
}

impl EntityKey {
    pub fn new<K: Into<String>, P: Into<String>>(kind: K, pk: P) -> Self { Self { kind: kind.into(), pk: pk.into() } }
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "{}#{}", self.kind, self.pk) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    Ref(EntityKey),
}

impl Value {
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn as_bool(&self) -> Option<bool> { if let Value::Bool(b) = self { Some(*b) } else { None } }

    pub fn as_str(&self) -> Option<&str> { if let Value::Str(s) = self { Some(s.as_str()) } else { None } }

    pub fn as_list(&self) -> Option<&[Value]> { if let Value::List(v) = self { Some(v.as_slice()) } else { None } }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text used when a value stands in for a primary key or feeds a string lookup.
    pub fn key_text(&self) -> Option<String> {
        match self {
            Value::Null | Value::List(_) => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            Value::DateTime(dt) => Some(dt.format(DATETIME_FORMATS[0]).to_string()),
            Value::Ref(k) => Some(k.pk.clone()),
        }
    }

    /// Calendar date carried by the value; ISO strings are accepted.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date()),
            Value::Str(s) => parse_datetime(s).map(|dt| dt.date()).or_else(|| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()),
            _ => None,
        }
    }

    fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }

    /// Equality with backend-style coercion. Null never equals anything.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::Ref(k), v) | (v, Value::Ref(k)) => v.key_text().map(|t| t == k.pk).unwrap_or(false),
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64 - b).abs() < f64::EPSILON,
            (Value::Date(_), Value::DateTime(_)) | (Value::DateTime(_), Value::Date(_)) => self.as_datetime() == other.as_datetime(),
            (Value::List(a), Value::List(b)) => a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.loose_eq(y)),
            _ => self == other,
        }
    }

    /// Ordering between compatible values; `None` when the operands cannot be compared.
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => self.as_f64()?.partial_cmp(&other.as_f64()?),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Date(_) | Value::DateTime(_), Value::Date(_) | Value::DateTime(_)) => Some(self.as_datetime()?.cmp(&other.as_datetime()?)),
            // ISO strings against temporal values, as a backend would cast the literal
            (Value::Date(_) | Value::DateTime(_), Value::Str(s)) => self.as_datetime()?.partial_cmp(&parse_temporal(s)?),
            (Value::Str(s), Value::Date(_) | Value::DateTime(_)) => parse_temporal(s)?.partial_cmp(&other.as_datetime()?),
            (Value::Ref(a), Value::Ref(b)) if a.kind == b.kind => Some(a.pk.cmp(&b.pk)),
            _ => None,
        }
    }

    /// Convert a JSON scalar or array. Objects have no scalar form and map to null;
    /// `Record::from_json` turns them into related entities instead.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null | serde_json::Value::Object(_) => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n.as_i64().map(Value::Int).or_else(|| n.as_f64().map(Value::Float)).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
        }
    }

    pub fn list<I, V>(items: I) -> Value where I: IntoIterator<Item = V>, V: Into<Value> {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS.iter().find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
}

fn parse_temporal(s: &str) -> Option<NaiveDateTime> {
    parse_datetime(s).or_else(|| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()?.and_hms_opt(0, 0, 0))
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Str(s) => write!(f, "'{}'", s),
            Value::Ref(k) => write!(f, "{}", k),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            other => write!(f, "{}", other.key_text().unwrap_or_default()),
        }
    }
}

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<u32> for Value { fn from(v: u32) -> Self { Value::Int(v as i64) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::Str(v.to_string()) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::Str(v) } }
impl From<&String> for Value { fn from(v: &String) -> Self { Value::Str(v.clone()) } }
impl From<NaiveDate> for Value { fn from(v: NaiveDate) -> Self { Value::Date(v) } }
impl From<NaiveDateTime> for Value { fn from(v: NaiveDateTime) -> Self { Value::DateTime(v) } }
impl From<EntityKey> for Value { fn from(v: EntityKey) -> Self { Value::Ref(v) } }
impl From<Vec<Value>> for Value { fn from(v: Vec<Value>) -> Self { Value::List(v) } }

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion() {
        assert!(Value::Int(3).loose_eq(&Value::Float(3.0)));
        assert_eq!(Value::Int(2).loose_cmp(&Value::Float(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Str("a".into()).loose_cmp(&Value::Int(1)), None);
    }

    #[test]
    fn null_never_equal() {
        assert!(!Value::Null.loose_eq(&Value::Null));
        assert!(!Value::Int(0).loose_eq(&Value::Null));
    }

    #[test]
    fn ref_matches_bare_pk() {
        let key = Value::Ref(EntityKey::new("user", "7"));
        assert!(key.loose_eq(&Value::Int(7)));
        assert!(Value::Str("7".into()).loose_eq(&key));
        assert!(!key.loose_eq(&Value::Ref(EntityKey::new("group", "7"))));
    }

    #[test]
    fn iso_strings_are_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::from("2024-02-29").as_date(), Some(d));
        assert_eq!(Value::from("2024-02-29T10:30:00").as_date(), Some(d));
        assert_eq!(Value::Date(d).loose_cmp(&Value::from("2024-03-01")), Some(Ordering::Less));
    }

    #[test]
    fn json_scalars() {
        let v: serde_json::Value = serde_json::json!([1, 2.5, "x", true, null]);
        assert_eq!(Value::from_json(&v), Value::List(vec![Value::Int(1), Value::Float(2.5), Value::from("x"), Value::Bool(true), Value::Null]));
    }
}
