//! Accessor tables for typed entities.
//!
//! A `Model<T>` names every attribute of `T` that filters may reach: scalar fields and
//! relations (with the kind they point at). Binding a value to its model yields an
//! `EntityRef` whose attribute access is a table lookup. Because the tables are
//! enumerable, a `Schema` of models can validate filter paths before they are handed to a
//! collection backend.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::entity::{Attr, Entity, EntityRef};
use crate::error::{PermError, PermResult};
use crate::filter::Filter;
use crate::value::Value;

type ScalarFn<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type OneFn<T> = Box<dyn Fn(&T) -> Option<EntityRef> + Send + Sync>;
type ManyFn<T> = Box<dyn Fn(&T) -> Vec<EntityRef> + Send + Sync>;

enum Accessor<T> {
    Scalar(ScalarFn<T>),
    One { target: String, get: OneFn<T> },
    Many { target: String, get: ManyFn<T> },
}

/// Public description of one registered field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    One(String),
    Many(String),
}

impl FieldKind {
    pub fn target(&self) -> Option<&str> {
        match self {
            FieldKind::Scalar => None,
            FieldKind::One(t) | FieldKind::Many(t) => Some(t.as_str()),
        }
    }
}

pub struct Model<T> {
    kind: String,
    pk: ScalarFn<T>,
    fields: BTreeMap<String, Accessor<T>>,
}

impl<T> Model<T> {
    pub fn new<F>(kind: &str, pk: F) -> Self where F: Fn(&T) -> Value + Send + Sync + 'static {
        Self { kind: kind.to_string(), pk: Box::new(pk), fields: BTreeMap::new() }
    }

    pub fn scalar<F>(mut self, name: &str, get: F) -> Self where F: Fn(&T) -> Value + Send + Sync + 'static {
        self.fields.insert(name.to_string(), Accessor::Scalar(Box::new(get)));
        self
    }

    pub fn one<F>(mut self, name: &str, target: &str, get: F) -> Self where F: Fn(&T) -> Option<EntityRef> + Send + Sync + 'static {
        self.fields.insert(name.to_string(), Accessor::One { target: target.to_string(), get: Box::new(get) });
        self
    }

    pub fn many<F>(mut self, name: &str, target: &str, get: F) -> Self where F: Fn(&T) -> Vec<EntityRef> + Send + Sync + 'static {
        self.fields.insert(name.to_string(), Accessor::Many { target: target.to_string(), get: Box::new(get) });
        self
    }

    pub fn kind(&self) -> &str { &self.kind }

    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(name).map(|a| match a {
            Accessor::Scalar(_) => FieldKind::Scalar,
            Accessor::One { target, .. } => FieldKind::One(target.clone()),
            Accessor::Many { target, .. } => FieldKind::Many(target.clone()),
        })
    }

    pub fn field_names(&self) -> Vec<String> { self.fields.keys().cloned().collect() }
}

impl<T: Debug + Send + Sync + 'static> Model<T> {
    /// Wrap a value so the evaluator can traverse it through this model's accessors.
    pub fn bind(model: &Arc<Model<T>>, value: T) -> EntityRef {
        Arc::new(Bound { model: model.clone(), value })
    }
}

impl<T> Debug for Model<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model").field("kind", &self.kind).field("fields", &self.fields.keys().collect::<Vec<_>>()).finish()
    }
}

pub struct Bound<T> {
    model: Arc<Model<T>>,
    value: T,
}

impl<T> Bound<T> {
    pub fn get(&self) -> &T { &self.value }
}

impl<T: Debug> Debug for Bound<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple(&self.model.kind).field(&self.value).finish()
    }
}

impl<T: Debug + Send + Sync> Entity for Bound<T> {
    fn kind(&self) -> &str { &self.model.kind }

    fn pk(&self) -> Value { (self.model.pk)(&self.value) }

    fn attr(&self, name: &str) -> Attr {
        match self.model.fields.get(name) {
            None => Attr::Absent,
            Some(Accessor::Scalar(get)) => Attr::Value(get(&self.value)),
            Some(Accessor::One { get, .. }) => get(&self.value).map(Attr::One).unwrap_or(Attr::Value(Value::Null)),
            Some(Accessor::Many { get, .. }) => Attr::Many(get(&self.value)),
        }
    }
}

/// Type-erased view of a model used for validation.
pub trait Describe: Send + Sync {
    fn kind(&self) -> &str;
    fn field_kind(&self, name: &str) -> Option<FieldKind>;
    fn field_names(&self) -> Vec<String>;
}

impl<T> Describe for Model<T> {
    fn kind(&self) -> &str { Model::kind(self) }
    fn field_kind(&self, name: &str) -> Option<FieldKind> { Model::field_kind(self, name) }
    fn field_names(&self) -> Vec<String> { Model::field_names(self) }
}

#[derive(Default, Clone)]
pub struct Schema {
    models: BTreeMap<String, Arc<dyn Describe>>,
}

impl Schema {
    pub fn new() -> Self { Self::default() }

    pub fn register(&mut self, model: Arc<dyn Describe>) { self.models.insert(model.kind().to_string(), model); }

    pub fn with(mut self, model: Arc<dyn Describe>) -> Self { self.register(model); self }

    pub fn contains(&self, kind: &str) -> bool { self.models.contains_key(kind) }

    pub fn kinds(&self) -> impl Iterator<Item = &str> { self.models.keys().map(|k| k.as_str()) }

    pub fn describe(&self, kind: &str) -> Option<&dyn Describe> { self.models.get(kind).map(|m| m.as_ref()) }

    /// Check that every condition path in `filter` resolves from `kind`: each hop must be a
    /// registered field, only relations may be traversed further, and relation targets must
    /// themselves be registered.
    pub fn validate(&self, kind: &str, filter: &Filter) -> PermResult<()> {
        for cond in filter.conditions() {
            let mut current = self.describe(kind).ok_or_else(|| PermError::config(format!("no model registered for '{}'", kind)))?;
            let mut at_scalar = false;
            for seg in cond.path.iter() {
                if at_scalar { return Err(PermError::unknown_field(current.kind(), seg.as_str())); }
                match current.field_kind(seg) {
                    None => return Err(PermError::unknown_field(current.kind(), seg.as_str())),
                    Some(FieldKind::Scalar) => at_scalar = true,
                    Some(FieldKind::One(target)) | Some(FieldKind::Many(target)) => {
                        current = self.describe(&target).ok_or_else(|| PermError::config(format!("relation '{}' points at unregistered kind '{}'", seg, target)))?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.debug_set().entries(self.models.keys()).finish() }
}
