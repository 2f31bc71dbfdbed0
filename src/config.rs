use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PermError, PermResult};

/// Registry-wide settings applied to every permission unless overridden.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// Outcome of an allow entry before anything is registered for the key.
    pub allow_default: bool,
    /// Outcome of a deny entry before anything is registered for the key.
    pub deny_default: bool,
    pub superuser_bypass: bool,
    /// Check filter paths against the attached schema before handing them to a collection.
    pub validate_filters: bool,
    /// Emit an info line per decision on `rulegate::decide`.
    pub audit: bool,
    pub max_delegation_depth: usize,
    pub overrides: BTreeMap<String, PermOverride>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            allow_default: false,
            deny_default: false,
            superuser_bypass: true,
            validate_filters: true,
            audit: false,
            max_delegation_depth: 16,
            overrides: BTreeMap::new(),
        }
    }
}

/// Per-permission overrides. Unspecified values inherit from the registry config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PermOverride {
    pub allow_default: Option<bool>,
    pub deny_default: Option<bool>,
    pub superuser_bypass: Option<bool>,
    pub audit: Option<bool>,
}

/// Fully resolved settings for one permission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub allow_default: bool,
    pub deny_default: bool,
    pub superuser_bypass: bool,
    pub validate_filters: bool,
    pub audit: bool,
    pub max_delegation_depth: usize,
}

impl EffectiveConfig {
    pub fn from_layers(global: &RulesConfig, perm: Option<&PermOverride>) -> Self {
        let mut eff = Self {
            allow_default: global.allow_default,
            deny_default: global.deny_default,
            superuser_bypass: global.superuser_bypass,
            validate_filters: global.validate_filters,
            audit: global.audit,
            max_delegation_depth: global.max_delegation_depth,
        };
        if let Some(ov) = perm {
            if let Some(v) = ov.allow_default { eff.allow_default = v; }
            if let Some(v) = ov.deny_default { eff.deny_default = v; }
            if let Some(v) = ov.superuser_bypass { eff.superuser_bypass = v; }
            if let Some(v) = ov.audit { eff.audit = v; }
        }
        eff
    }
}

const ENV_KEYS: [&str; 6] = [
    "RULEGATE_ALLOW_DEFAULT",
    "RULEGATE_DENY_DEFAULT",
    "RULEGATE_SUPERUSER_BYPASS",
    "RULEGATE_VALIDATE_FILTERS",
    "RULEGATE_AUDIT",
    "RULEGATE_MAX_DELEGATION_DEPTH",
];

fn parse_flag(key: &str, raw: &str) -> PermResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(PermError::config(format!("{}: expected a boolean, got '{}'", key, other))),
    }
}

impl RulesConfig {
    pub fn effective_for(&self, perm: &str) -> EffectiveConfig { EffectiveConfig::from_layers(self, self.overrides.get(perm)) }

    pub fn with_override(mut self, perm: &str, ov: PermOverride) -> Self { self.overrides.insert(perm.to_string(), ov); self }

    pub fn from_json(text: &str) -> PermResult<Self> {
        let cfg: RulesConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &std::path::Path) -> PermResult<Self> { Self::from_json(&std::fs::read_to_string(path)?) }

    pub fn from_env() -> PermResult<Self> { Self::from_env_with(|k| std::env::var(k).ok()) }

    /// Defaults overlaid with whichever `RULEGATE_*` keys `lookup` returns.
    pub fn from_env_with<F: Fn(&str) -> Option<String>>(lookup: F) -> PermResult<Self> {
        let mut cfg = Self::default();
        for key in ENV_KEYS {
            let Some(raw) = lookup(key) else { continue };
            match key {
                "RULEGATE_ALLOW_DEFAULT" => cfg.allow_default = parse_flag(key, &raw)?,
                "RULEGATE_DENY_DEFAULT" => cfg.deny_default = parse_flag(key, &raw)?,
                "RULEGATE_SUPERUSER_BYPASS" => cfg.superuser_bypass = parse_flag(key, &raw)?,
                "RULEGATE_VALIDATE_FILTERS" => cfg.validate_filters = parse_flag(key, &raw)?,
                "RULEGATE_AUDIT" => cfg.audit = parse_flag(key, &raw)?,
                _ => {
                    cfg.max_delegation_depth = raw.trim().parse::<usize>()
                        .map_err(|_| PermError::config(format!("{}: expected a non-negative integer, got '{}'", key, raw)))?;
                }
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> PermResult<()> {
        if self.max_delegation_depth == 0 { return Err(PermError::config("max_delegation_depth must be at least 1")); }
        if let Some(k) = self.overrides.keys().find(|k| k.trim().is_empty()) {
            return Err(PermError::config(format!("override for empty permission name '{}'", k)));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
