//! The principal whose access is being checked.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::value::{EntityKey, Value};

fn default_kind() -> String { "user".to_string() }

/// Named permissions held by an actor independently of any object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalPermissions(BTreeSet<String>);

impl GlobalPermissions {
    /// Idempotent.
    pub fn add_permission(&mut self, perm: &str) { self.0.insert(perm.to_string()); }

    /// Removing a permission that is not held is a no-op.
    pub fn remove_permission(&mut self, perm: &str) { self.0.remove(perm); }

    pub fn get_permissions(&self) -> &BTreeSet<String> { &self.0 }

    pub fn has(&self, perm: &str) -> bool { self.0.contains(perm) }
}

impl<S: Into<String>> FromIterator<S> for GlobalPermissions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self { Self(iter.into_iter().map(Into::into).collect()) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub superuser: bool,
    #[serde(default)]
    pub global_permissions: GlobalPermissions,
    #[serde(default)]
    pub attrs: BTreeMap<String, Value>,
}

impl Actor {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self { id: id.into(), kind: default_kind(), superuser: false, global_permissions: GlobalPermissions::default(), attrs: BTreeMap::new() }
    }

    pub fn with_kind<S: Into<String>>(mut self, kind: S) -> Self { self.kind = kind.into(); self }

    pub fn as_superuser(mut self) -> Self { self.superuser = true; self }

    pub fn with_attr<V: Into<Value>>(mut self, name: &str, value: V) -> Self { self.attrs.insert(name.to_string(), value.into()); self }

    pub fn with_global_perm(mut self, perm: &str) -> Self { self.global_permissions.add_permission(perm); self }

    pub fn is_superuser(&self) -> bool { self.superuser }

    pub fn has_global_perm(&self, perm: &str) -> bool { self.global_permissions.has(perm) }

    pub fn attr(&self, name: &str) -> Option<&Value> { self.attrs.get(name) }

    /// The actor as a related-entity key, for conditions such as `owner=actor`.
    pub fn key(&self) -> EntityKey { EntityKey::new(self.kind.as_str(), self.id.as_str()) }
}

impl From<&Actor> for Value {
    fn from(a: &Actor) -> Self { Value::Ref(a.key()) }
}
