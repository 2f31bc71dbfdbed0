//! Collections that a permission filter can narrow.
//!
//! `Collection` is the seam to whatever store holds the objects: a database-backed
//! implementation translates the `Filter` into its native query. `EntitySet` is the
//! in-memory implementation and runs every member through the evaluator.

use std::collections::HashSet;

use crate::entity::EntityRef;
use crate::error::PermResult;
use crate::evaluator::FilterEvaluator;
use crate::filter::Filter;
use crate::value::EntityKey;

pub trait Collection: Sized {
    /// Entity kind of the members, used to pick the rules that apply.
    fn kind(&self) -> &str;

    /// Same collection with every member removed.
    fn none(self) -> Self;

    /// Members matching `filter`, with the evaluator's fan-out and null semantics.
    fn filter(self, filter: &Filter) -> PermResult<Self>;

    fn exclude(self, filter: &Filter) -> PermResult<Self> { self.filter(&!filter.clone()) }
}

#[derive(Debug, Clone)]
pub struct EntitySet {
    kind: String,
    items: Vec<EntityRef>,
}

impl EntitySet {
    pub fn new(kind: &str) -> Self { Self { kind: kind.to_string(), items: Vec::new() } }

    pub fn from_items<I: IntoIterator<Item = EntityRef>>(kind: &str, items: I) -> Self {
        Self { kind: kind.to_string(), items: items.into_iter().collect() }
    }

    pub fn push(&mut self, item: EntityRef) { self.items.push(item); }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityRef> { self.items.iter() }

    pub fn keys(&self) -> Vec<EntityKey> { self.items.iter().map(|e| e.key()).collect() }

    pub fn contains_key(&self, key: &EntityKey) -> bool { self.items.iter().any(|e| &e.key() == key) }

    /// Members of either set, first occurrence wins.
    pub fn union(mut self, other: EntitySet) -> EntitySet {
        let mut seen: HashSet<EntityKey> = self.items.iter().map(|e| e.key()).collect();
        for item in other.items {
            if seen.insert(item.key()) { self.items.push(item); }
        }
        self
    }

    pub fn into_vec(self) -> Vec<EntityRef> { self.items }
}

impl Collection for EntitySet {
    fn kind(&self) -> &str { &self.kind }

    fn none(mut self) -> Self { self.items.clear(); self }

    fn filter(self, filter: &Filter) -> PermResult<Self> {
        let mut kept = Vec::with_capacity(self.items.len());
        for item in self.items {
            if FilterEvaluator::evaluate(item.as_ref(), filter)? { kept.push(item); }
        }
        Ok(Self { kind: self.kind, items: kept })
    }
}

impl IntoIterator for EntitySet {
    type Item = EntityRef;
    type IntoIter = std::vec::IntoIter<EntityRef>;
    fn into_iter(self) -> Self::IntoIter { self.items.into_iter() }
}

impl<'a> IntoIterator for &'a EntitySet {
    type Item = &'a EntityRef;
    type IntoIter = std::slice::Iter<'a, EntityRef>;
    fn into_iter(self) -> Self::IntoIter { self.items.iter() }
}
