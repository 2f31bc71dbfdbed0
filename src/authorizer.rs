//! Decision point for request handlers.
//!
//! Wraps a shared, fully registered `Rules` value. Refusals come back as
//! `Access::Forbidden` or `Ok(false)`; only evaluation failures are `Err`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::actor::Actor;
use crate::collection::Collection;
use crate::entity::Entity;
use crate::error::PermResult;
use crate::rules::Rules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Forbidden,
}

impl Access {
    pub fn is_granted(&self) -> bool { matches!(self, Access::Granted) }
}

impl From<bool> for Access {
    fn from(b: bool) -> Self { if b { Access::Granted } else { Access::Forbidden } }
}

#[derive(Debug, Clone)]
pub struct Authorizer {
    rules: Arc<Rules>,
}

impl Authorizer {
    pub fn new(rules: Arc<Rules>) -> Self { Self { rules } }

    pub fn rules(&self) -> &Rules { &self.rules }

    pub fn has_perm(&self, actor: &Actor, perm: &str, obj: Option<&dyn Entity>) -> PermResult<bool> { self.rules.decide(actor, perm, obj) }

    pub fn check(&self, actor: &Actor, perm: &str, obj: Option<&dyn Entity>) -> PermResult<Access> { self.has_perm(actor, perm, obj).map(Access::from) }

    pub fn filter_collection<C: Collection>(&self, actor: &Actor, perm: &str, coll: C) -> PermResult<C> { self.rules.filter(actor, perm, coll) }

    /// Lazy permission lookup for one object, e.g. for rendering a row with several actions.
    pub fn perms_for<'a>(&'a self, actor: &'a Actor, obj: &'a dyn Entity) -> ObjectPerms<'a> { ObjectPerms { auth: self, actor, obj } }
}

pub struct ObjectPerms<'a> {
    auth: &'a Authorizer,
    actor: &'a Actor,
    obj: &'a dyn Entity,
}

impl ObjectPerms<'_> {
    pub fn has(&self, perm: &str) -> PermResult<bool> { self.auth.has_perm(self.actor, perm, Some(self.obj)) }

    pub fn all(&self, perms: &[&str]) -> PermResult<BTreeMap<String, bool>> {
        let mut out = BTreeMap::new();
        for p in perms {
            out.insert(p.to_string(), self.has(p)?);
        }
        Ok(out)
    }
}
