//! Role-based front end.
//!
//! An alternative to registering predicates: a `RoleProvider` hands out the roles an
//! actor plays, and each role either grants a permission outright or contributes a
//! filter for a kind. Roles are OR-ed: any granting role grants. This front end does not
//! consult a `Rules` registry; pick one model per permission surface.

use tracing::debug;

use crate::actor::Actor;
use crate::collection::Collection;
use crate::config::RulesConfig;
use crate::entity::Entity;
use crate::error::PermResult;
use crate::evaluator::FilterEvaluator;
use crate::predicate::Decision;

pub trait Role: Send + Sync {
    /// Permission held regardless of object.
    fn has_perm(&self, _perm: &str) -> bool { false }

    /// Which objects of `kind` the role covers for `perm`.
    fn filter_for_perm(&self, _perm: &str, _kind: &str) -> Decision { Decision::Boolean(false) }

    fn name(&self) -> &str { "role" }
}

pub trait RoleProvider: Send + Sync {
    fn roles_for(&self, actor: &Actor) -> Vec<Box<dyn Role>>;
}

impl<F> RoleProvider for F where F: Fn(&Actor) -> Vec<Box<dyn Role>> + Send + Sync {
    fn roles_for(&self, actor: &Actor) -> Vec<Box<dyn Role>> { self(actor) }
}

pub struct RoleAuthorizer {
    provider: Box<dyn RoleProvider>,
    config: RulesConfig,
}

impl RoleAuthorizer {
    pub fn new<P: RoleProvider + 'static>(provider: P) -> Self { Self { provider: Box::new(provider), config: RulesConfig::default() } }

    pub fn with_config(mut self, config: RulesConfig) -> Self { self.config = config; self }

    fn bypass(&self, actor: &Actor, perm: &str) -> bool { actor.is_superuser() && self.config.effective_for(perm).superuser_bypass }

    pub fn has_perm(&self, actor: &Actor, perm: &str, obj: Option<&dyn Entity>) -> PermResult<bool> {
        if self.bypass(actor, perm) { return Ok(true); }
        let roles = self.provider.roles_for(actor);
        if let Some(r) = roles.iter().find(|r| r.has_perm(perm)) {
            debug!(target: "rulegate::roles", "{} holds {} through {}", actor.key(), perm, r.name());
            return Ok(true);
        }
        let Some(o) = obj else { return Ok(false) };
        for r in roles.iter() {
            let granted = match r.filter_for_perm(perm, o.kind()) {
                Decision::Boolean(b) => b,
                Decision::Filter(f) => FilterEvaluator::evaluate(o, &f)?,
            };
            if granted {
                debug!(target: "rulegate::roles", "{} holds {} on {} through {}", actor.key(), perm, o.key(), r.name());
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// OR of every role's contribution for `kind`. Global grants from `has_perm` are not
    /// included.
    pub fn decision_for(&self, actor: &Actor, perm: &str, kind: &str) -> Decision {
        if self.bypass(actor, perm) { return Decision::Boolean(true); }
        let mut acc = Decision::Boolean(false);
        for r in self.provider.roles_for(actor) {
            acc = acc.or(r.filter_for_perm(perm, kind));
            if acc.is_true() { break; }
        }
        acc
    }

    pub fn filter<C: Collection>(&self, actor: &Actor, perm: &str, coll: C) -> PermResult<C> {
        let decision = self.decision_for(actor, perm, coll.kind());
        debug!(target: "rulegate::roles", "{} {} on {}: {:?}", actor.key(), perm, coll.kind(), decision);
        match decision {
            Decision::Boolean(true) => Ok(coll),
            Decision::Boolean(false) => Ok(coll.none()),
            Decision::Filter(f) => coll.filter(&f),
        }
    }
}
