//! Allow/deny rule registry and resolution.
//!
//! Rules are keyed by `(permission, kind)`, where a missing kind marks a global permission.
//! Every key holds one allow and one deny predicate; registering again for the same key ORs
//! the new predicate into the existing one. The effective rule for a key is
//! `allow & !deny`, so a matching deny always wins.
//!
//! A `Rules` value is built once at startup and then shared read-only (typically behind an
//! `Arc`). Registration takes `&mut self`, so it cannot race with evaluation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::actor::Actor;
use crate::collection::Collection;
use crate::config::{EffectiveConfig, RulesConfig};
use crate::entity::Entity;
use crate::error::{PermError, PermResult};
use crate::evaluator::FilterEvaluator;
use crate::model::Schema;
use crate::predicate::{Decision, Predicate, Scope, Target};

type RuleKey = (String, Option<String>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Allow,
    Deny,
}

#[derive(Debug, Default)]
pub struct Rules {
    allow_rules: HashMap<RuleKey, Predicate>,
    deny_rules: HashMap<RuleKey, Predicate>,
    config: RulesConfig,
    schema: Option<Arc<Schema>>,
}

fn key(perm: &str, kind: Option<&str>) -> RuleKey { (perm.to_string(), kind.map(|k| k.to_string())) }

impl Rules {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(config: RulesConfig) -> Self { Self { config, ..Self::default() } }

    /// Attach a schema: registrations for unknown kinds are rejected and filters are
    /// path-checked before reaching a collection.
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self { self.schema = Some(schema); self }

    pub fn config(&self) -> &RulesConfig { &self.config }

    pub fn schema(&self) -> Option<&Schema> { self.schema.as_deref() }

    pub fn allow(&mut self, perm: &str, kind: &str, pred: Predicate) -> PermResult<()> { self.register(Side::Allow, perm, Some(kind), pred) }

    pub fn deny(&mut self, perm: &str, kind: &str, pred: Predicate) -> PermResult<()> { self.register(Side::Deny, perm, Some(kind), pred) }

    pub fn allow_global(&mut self, perm: &str, pred: Predicate) -> PermResult<()> { self.register(Side::Allow, perm, None, pred) }

    pub fn deny_global(&mut self, perm: &str, pred: Predicate) -> PermResult<()> { self.register(Side::Deny, perm, None, pred) }

    fn register(&mut self, side: Side, perm: &str, kind: Option<&str>, pred: Predicate) -> PermResult<()> {
        if perm.is_empty() || perm.chars().any(char::is_whitespace) {
            return Err(PermError::config(format!("invalid permission name '{}'", perm)));
        }
        if let Some(k) = kind {
            if k.is_empty() { return Err(PermError::config(format!("empty entity kind for permission '{}'", perm))); }
            if let Some(schema) = self.schema.as_ref() {
                if !schema.contains(k) { return Err(PermError::config(format!("permission '{}' registered for unknown kind '{}'", perm, k))); }
            }
        }
        let eff = self.config.effective_for(perm);
        let (table, default) = match side {
            Side::Allow => (&mut self.allow_rules, eff.allow_default),
            Side::Deny => (&mut self.deny_rules, eff.deny_default),
        };
        let k = key(perm, kind);
        let merged = match table.remove(&k) {
            Some(existing) => existing | pred,
            None => Predicate::constant(default) | pred,
        };
        debug!(target: "rulegate::rules", "{:?} {} on {}: {:?}", side, perm, kind.unwrap_or("<global>"), merged);
        table.insert(k, merged);
        Ok(())
    }

    /// Drop every registered rule; configuration and schema are kept.
    pub fn clear(&mut self) {
        self.allow_rules.clear();
        self.deny_rules.clear();
        debug!(target: "rulegate::rules", "cleared all rules");
    }

    pub fn is_registered(&self, perm: &str, kind: Option<&str>) -> bool {
        let k = key(perm, kind);
        self.allow_rules.contains_key(&k) || self.deny_rules.contains_key(&k)
    }

    /// Every key with at least one registered rule, sorted.
    pub fn permissions(&self) -> Vec<(String, Option<String>)> {
        let mut keys: Vec<RuleKey> = self.allow_rules.keys().chain(self.deny_rules.keys()).cloned().collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Effective predicate for a key: `allow & !deny`, with configured defaults for sides
    /// that have nothing registered.
    pub fn resolve(&self, perm: &str, kind: Option<&str>) -> Predicate {
        let eff = self.config.effective_for(perm);
        let k = key(perm, kind);
        let allow = self.allow_rules.get(&k).cloned().unwrap_or_else(|| Predicate::constant(eff.allow_default));
        let deny = self.deny_rules.get(&k).cloned().unwrap_or_else(|| Predicate::constant(eff.deny_default));
        allow & !deny
    }

    fn bypass(&self, eff: &EffectiveConfig, actor: &Actor) -> bool { eff.superuser_bypass && actor.is_superuser() }

    /// Yes/no answer for one object, or for the global permission when `obj` is `None`.
    ///
    /// With `superuser_bypass` on (the default) a superuser is granted before any rule runs,
    /// so deny entries never apply to them. Turn it off per permission to hold superusers to
    /// the registered rules.
    pub fn decide(&self, actor: &Actor, perm: &str, obj: Option<&dyn Entity>) -> PermResult<bool> {
        let eff = self.config.effective_for(perm);
        let granted = if self.bypass(&eff, actor) {
            true
        } else {
            let target = obj.map(Target::Object).unwrap_or(Target::Global);
            let decision = self.resolve(perm, target.kind()).eval_scoped(&Scope::new(actor, target, Some(self)))?;
            match (decision, obj) {
                (Decision::Boolean(b), _) => b,
                (Decision::Filter(f), Some(o)) => FilterEvaluator::evaluate(o, &f)?,
                (Decision::Filter(f), None) => {
                    return Err(PermError::config(format!("global permission '{}' resolved to a filter {}", perm, f)));
                }
            }
        };
        if eff.audit {
            let subject = obj.map(|o| o.key().to_string()).unwrap_or_else(|| "<global>".to_string());
            info!(target: "rulegate::decide", "actor={} perm={} object={} granted={}", actor.key(), perm, subject, granted);
        }
        Ok(granted)
    }

    /// Unresolved decision for a whole kind: a boolean, or the filter a collection backend
    /// should apply. Superusers get `true` under the same bypass as `decide`.
    pub fn filter_decision(&self, actor: &Actor, perm: &str, kind: &str) -> PermResult<Decision> {
        let eff = self.config.effective_for(perm);
        if self.bypass(&eff, actor) { return Ok(Decision::Boolean(true)); }
        self.resolve(perm, Some(kind)).eval_scoped(&Scope::new(actor, Target::Kind(kind), Some(self)))
    }

    /// Narrow `coll` to the members `actor` holds `perm` on.
    pub fn filter<C: Collection>(&self, actor: &Actor, perm: &str, coll: C) -> PermResult<C> {
        let kind = coll.kind().to_string();
        let decision = self.filter_decision(actor, perm, &kind)?;
        let eff = self.config.effective_for(perm);
        if eff.audit {
            info!(target: "rulegate::decide", "actor={} perm={} kind={} filter={:?}", actor.key(), perm, kind, decision);
        }
        match decision {
            Decision::Boolean(true) => Ok(coll),
            Decision::Boolean(false) => Ok(coll.none()),
            Decision::Filter(f) => {
                if eff.validate_filters {
                    if let Some(schema) = self.schema.as_ref() { schema.validate(&kind, &f)?; }
                }
                coll.filter(&f)
            }
        }
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod rules_tests;
