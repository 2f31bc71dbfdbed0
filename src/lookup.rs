//! Lookup operators (the `__op` suffix of a condition key) and their per-candidate semantics.
//! Set-level rules (any-candidate matching, `isnull`) live in the evaluator; this module
//! only answers "does this one candidate satisfy the operator against the value".

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::Datelike;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{PermError, PermResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lookup {
    Exact,
    IExact,
    Contains,
    IContains,
    In,
    Gt,
    Gte,
    Lt,
    Lte,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,
    Range,
    Year,
    Month,
    Day,
    #[serde(rename = "week_day")]
    WeekDay,
    IsNull,
    Regex,
    IRegex,
    Search,
}

impl Lookup {
    pub const ALL: [Lookup; 22] = [
        Lookup::Exact, Lookup::IExact, Lookup::Contains, Lookup::IContains, Lookup::In,
        Lookup::Gt, Lookup::Gte, Lookup::Lt, Lookup::Lte,
        Lookup::StartsWith, Lookup::IStartsWith, Lookup::EndsWith, Lookup::IEndsWith,
        Lookup::Range, Lookup::Year, Lookup::Month, Lookup::Day, Lookup::WeekDay,
        Lookup::IsNull, Lookup::Regex, Lookup::IRegex, Lookup::Search,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::Exact => "exact",
            Lookup::IExact => "iexact",
            Lookup::Contains => "contains",
            Lookup::IContains => "icontains",
            Lookup::In => "in",
            Lookup::Gt => "gt",
            Lookup::Gte => "gte",
            Lookup::Lt => "lt",
            Lookup::Lte => "lte",
            Lookup::StartsWith => "startswith",
            Lookup::IStartsWith => "istartswith",
            Lookup::EndsWith => "endswith",
            Lookup::IEndsWith => "iendswith",
            Lookup::Range => "range",
            Lookup::Year => "year",
            Lookup::Month => "month",
            Lookup::Day => "day",
            Lookup::WeekDay => "week_day",
            Lookup::IsNull => "isnull",
            Lookup::Regex => "regex",
            Lookup::IRegex => "iregex",
            Lookup::Search => "search",
        }
    }

    /// Recognize a key segment as an operator. Unrecognized segments are attribute names.
    pub fn from_token(token: &str) -> Option<Lookup> { Lookup::ALL.iter().copied().find(|l| l.as_str() == token) }

    /// Reject values whose shape can never satisfy the operator, before any candidate is
    /// looked at, so a malformed condition fails even against an empty candidate set.
    pub fn check_value(&self, value: &Value) -> PermResult<()> {
        match self {
            Lookup::Search => Err(PermError::UnsupportedLookup(self.as_str().to_string())),
            Lookup::In if value.as_list().is_none() => Err(PermError::invalid_value(*self, format!("expected a list, got {}", value))),
            Lookup::Range => match value.as_list() {
                Some(bounds) if bounds.len() == 2 => Ok(()),
                _ => Err(PermError::invalid_value(*self, format!("expected [low, high], got {}", value))),
            },
            Lookup::IsNull if value.as_bool().is_none() => Err(PermError::invalid_value(*self, format!("expected a boolean, got {}", value))),
            Lookup::Year | Lookup::Month | Lookup::Day | Lookup::WeekDay if value.as_i64().is_none() => {
                Err(PermError::invalid_value(*self, format!("expected an integer, got {}", value)))
            }
            Lookup::Regex | Lookup::IRegex => {
                let pattern = value.as_str().ok_or_else(|| PermError::invalid_value(*self, format!("expected a pattern string, got {}", value)))?;
                compiled(*self, pattern).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    /// Operator table applied to a single candidate.
    pub fn test(&self, candidate: &Value, value: &Value) -> PermResult<bool> {
        let out = match self {
            Lookup::Exact => candidate.loose_eq(value),
            Lookup::IExact => text_pair(candidate, value).map(|(c, v)| c.to_lowercase() == v.to_lowercase()).unwrap_or(false),
            Lookup::Contains => text_pair(candidate, value).map(|(c, v)| c.contains(&v)).unwrap_or(false),
            Lookup::IContains => text_pair(candidate, value).map(|(c, v)| c.to_lowercase().contains(&v.to_lowercase())).unwrap_or(false),
            Lookup::In => value.as_list().map(|items| items.iter().any(|v| candidate.loose_eq(v))).unwrap_or(false),
            Lookup::Gt => ordered(candidate, value, |o| o == Ordering::Greater),
            Lookup::Gte => ordered(candidate, value, |o| o != Ordering::Less),
            Lookup::Lt => ordered(candidate, value, |o| o == Ordering::Less),
            Lookup::Lte => ordered(candidate, value, |o| o != Ordering::Greater),
            Lookup::StartsWith => text_pair(candidate, value).map(|(c, v)| c.starts_with(&v)).unwrap_or(false),
            Lookup::IStartsWith => text_pair(candidate, value).map(|(c, v)| c.to_lowercase().starts_with(&v.to_lowercase())).unwrap_or(false),
            Lookup::EndsWith => text_pair(candidate, value).map(|(c, v)| c.ends_with(&v)).unwrap_or(false),
            Lookup::IEndsWith => text_pair(candidate, value).map(|(c, v)| c.to_lowercase().ends_with(&v.to_lowercase())).unwrap_or(false),
            Lookup::Range => match value.as_list() {
                Some([low, high]) => ordered(candidate, low, |o| o != Ordering::Less) && ordered(candidate, high, |o| o != Ordering::Greater),
                _ => false,
            },
            Lookup::Year | Lookup::Month | Lookup::Day | Lookup::WeekDay => match (date_part(*self, candidate), value.as_i64()) {
                (Some(part), Some(want)) => part == want,
                _ => false,
            },
            // Set-level operator; a lone candidate is by definition not null.
            Lookup::IsNull => value.as_bool() == Some(false),
            Lookup::Regex | Lookup::IRegex => {
                let Some(pattern) = value.as_str() else { return Err(PermError::invalid_value(*self, "expected a pattern string")); };
                let re = compiled(*self, pattern)?;
                candidate.key_text().map(|c| re.is_match(&c)).unwrap_or(false)
            }
            Lookup::Search => return Err(PermError::UnsupportedLookup(self.as_str().to_string())),
        };
        Ok(out)
    }
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

fn text_pair(candidate: &Value, value: &Value) -> Option<(String, String)> {
    if candidate.as_list().is_some() { return None; }
    Some((candidate.key_text()?, value.key_text()?))
}

fn ordered(candidate: &Value, value: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match candidate.loose_cmp(value) {
        Some(o) => accept(o),
        None => {
            trace!(target: "rulegate::eval", "incomparable operands {} and {}", candidate, value);
            false
        }
    }
}

/// Date component extraction. `week_day` numbers Sunday as 1 through Saturday as 7.
fn date_part(lookup: Lookup, candidate: &Value) -> Option<i64> {
    let d = candidate.as_date()?;
    Some(match lookup {
        Lookup::Year => d.year() as i64,
        Lookup::Month => d.month() as i64,
        Lookup::Day => d.day() as i64,
        Lookup::WeekDay => ((d.weekday().num_days_from_monday() as i64 + 1) % 7) + 1,
        _ => return None,
    })
}

// Compiled patterns keyed by (pattern, case-insensitive); tiny and cleared wholesale when full
static REGEX_CACHE: Lazy<RwLock<HashMap<(String, bool), Regex>>> = Lazy::new(|| RwLock::new(HashMap::new()));
const REGEX_CACHE_CAP: usize = 256;

fn compiled(lookup: Lookup, pattern: &str) -> PermResult<Regex> {
    let ci = lookup == Lookup::IRegex;
    let key = (pattern.to_string(), ci);
    if let Some(re) = REGEX_CACHE.read().get(&key) { return Ok(re.clone()); }
    let re = RegexBuilder::new(pattern)
        .case_insensitive(ci)
        .build()
        .map_err(|e| PermError::invalid_value(lookup, e.to_string()))?;
    let mut w = REGEX_CACHE.write();
    if w.len() >= REGEX_CACHE_CAP { w.clear(); }
    w.insert(key, re.clone());
    Ok(re)
}
