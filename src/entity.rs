//! Loaded objects as seen by the evaluator: attribute-by-name resolution plus enumeration
//! of related objects. `Record` is a map-backed implementation that can be built by hand
//! or from a JSON document.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{PermError, PermResult};
use crate::value::{EntityKey, Value};

pub type EntityRef = Arc<dyn Entity>;

/// Result of reading one attribute off an entity.
#[derive(Debug, Clone)]
pub enum Attr {
    /// The entity has no such attribute.
    Absent,
    Value(Value),
    /// Single-valued relation (foreign key / one-to-one).
    One(EntityRef),
    /// Multi-valued relation; an empty vector means no related rows.
    Many(Vec<EntityRef>),
}

pub trait Entity: Debug + Send + Sync {
    /// Name of the entity type, used as the rule key and the collection kind.
    fn kind(&self) -> &str;
    fn pk(&self) -> Value;
    fn attr(&self, name: &str) -> Attr;

    fn key(&self) -> EntityKey { EntityKey::new(self.kind(), self.pk().key_text().unwrap_or_default()) }
}

#[derive(Debug, Clone)]
pub enum Slot {
    Value(Value),
    One(Arc<Record>),
    Many(Vec<Arc<Record>>),
}

#[derive(Debug, Clone)]
pub struct Record {
    kind: String,
    pk: Value,
    fields: BTreeMap<String, Slot>,
}

impl Record {
    pub fn new<K: Into<String>, P: Into<Value>>(kind: K, pk: P) -> Self {
        Self { kind: kind.into(), pk: pk.into(), fields: BTreeMap::new() }
    }

    pub fn with<V: Into<Value>>(mut self, name: &str, value: V) -> Self {
        self.fields.insert(name.to_string(), Slot::Value(value.into()));
        self
    }

    pub fn with_one(mut self, name: &str, related: Arc<Record>) -> Self {
        self.fields.insert(name.to_string(), Slot::One(related));
        self
    }

    pub fn with_many(mut self, name: &str, related: Vec<Arc<Record>>) -> Self {
        self.fields.insert(name.to_string(), Slot::Many(related));
        self
    }

    pub fn set(&mut self, name: &str, slot: Slot) { self.fields.insert(name.to_string(), slot); }

    pub fn field_names(&self) -> impl Iterator<Item = &str> { self.fields.keys().map(|k| k.as_str()) }

    pub fn into_ref(self) -> EntityRef { Arc::new(self) }

    /// Build an object graph from a JSON document.
    ///
    /// The primary key comes from `"id"` (or `"pk"`). Nested objects become single
    /// relations and arrays of objects become multi-valued relations; their kind is taken
    /// from a `"_kind"` member when present, otherwise from the field name. An empty array
    /// is an empty relation. Everything else is a scalar.
    pub fn from_json(kind: &str, json: &serde_json::Value) -> PermResult<Record> {
        let obj = json.as_object().ok_or_else(|| PermError::config(format!("record '{}' must be a JSON object", kind)))?;
        let kind = obj.get("_kind").and_then(|k| k.as_str()).unwrap_or(kind);
        let pk = obj.get("id").or_else(|| obj.get("pk")).map(Value::from_json).unwrap_or(Value::Null);
        let mut rec = Record::new(kind, pk);
        for (name, v) in obj.iter() {
            if name == "_kind" { continue; }
            let slot = match v {
                serde_json::Value::Object(_) => Slot::One(Arc::new(Record::from_json(name, v)?)),
                serde_json::Value::Array(items) if items.iter().all(|i| i.is_object()) => {
                    let mut related = Vec::with_capacity(items.len());
                    for item in items { related.push(Arc::new(Record::from_json(name, item)?)); }
                    Slot::Many(related)
                }
                serde_json::Value::Array(items) if items.iter().any(|i| i.is_object()) => {
                    return Err(PermError::config(format!("field '{}' of '{}' mixes objects and scalars", name, kind)));
                }
                other => Slot::Value(Value::from_json(other)),
            };
            rec.fields.insert(name.clone(), slot);
        }
        Ok(rec)
    }
}

impl Entity for Record {
    fn kind(&self) -> &str { &self.kind }

    fn pk(&self) -> Value { self.pk.clone() }

    fn attr(&self, name: &str) -> Attr {
        match self.fields.get(name) {
            None => Attr::Absent,
            Some(Slot::Value(v)) => Attr::Value(v.clone()),
            Some(Slot::One(r)) => Attr::One(r.clone() as EntityRef),
            Some(Slot::Many(rs)) => Attr::Many(rs.iter().map(|r| r.clone() as EntityRef).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_graph_shapes() {
        let doc = json!({
            "id": 3,
            "name": "banana",
            "owner": {"id": "alice", "_kind": "user"},
            "allergic_users": [{"id": "alice"}, {"id": "carol"}],
            "tags": ["yellow", "fruit"],
            "eaten_by": []
        });
        let rec = Record::from_json("food", &doc).unwrap();
        assert_eq!(rec.kind(), "food");
        assert_eq!(rec.key(), EntityKey::new("food", "3"));
        match rec.attr("owner") { Attr::One(u) => assert_eq!(u.kind(), "user"), other => panic!("unexpected {:?}", other) }
        match rec.attr("allergic_users") { Attr::Many(us) => { assert_eq!(us.len(), 2); assert_eq!(us[0].kind(), "allergic_users"); } other => panic!("unexpected {:?}", other) }
        match rec.attr("tags") { Attr::Value(Value::List(v)) => assert_eq!(v.len(), 2), other => panic!("unexpected {:?}", other) }
        match rec.attr("eaten_by") { Attr::Many(v) => assert!(v.is_empty()), other => panic!("unexpected {:?}", other) }
        assert!(matches!(rec.attr("colour"), Attr::Absent));
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(Record::from_json("food", &json!([1, 2])).is_err());
    }

    #[test]
    fn mixed_arrays_are_rejected() {
        let err = Record::from_json("food", &json!({"id": 1, "eaten_by": [{"id": "alice"}, "bob"]})).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("eaten_by"));
    }
}
