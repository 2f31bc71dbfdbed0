//! Declarative filter expressions.
//!
//! A `Filter` is a tree of conditions joined by AND/OR with a negation flag per node. The
//! same value is run in memory by the evaluator for single-object checks and handed to a
//! `Collection` backend for bulk filtering, so it is plain data and serde-friendly.
//!
//! Keys use the `field__field__lookup` convention: `Filter::q("owner__name__icontains", "bo")`
//! walks `owner` then `name` and applies `icontains`. A key whose last segment is not a
//! known lookup is a pure path compared with `exact`.

use std::fmt::{Display, Formatter};
use std::ops::{BitAnd, BitOr, Not};

use serde::{Deserialize, Serialize};

use crate::lookup::Lookup;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub path: Vec<String>,
    pub lookup: Lookup,
    pub value: Value,
}

impl Condition {
    pub fn new<I, S, V>(path: I, lookup: Lookup, value: V) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        V: Into<Value>,
    {
        Self { path: path.into_iter().map(Into::into).collect(), lookup, value: value.into() }
    }

    /// Split a `a__b__lookup` key into path and operator.
    pub fn parse<V: Into<Value>>(key: &str, value: V) -> Self {
        let mut parts: Vec<String> = key.split("__").filter(|s| !s.is_empty()).map(|s| s.to_string()).collect();
        let lookup = match parts.last().and_then(|t| Lookup::from_token(t)) {
            Some(l) if parts.len() > 1 => { parts.pop(); l }
            _ => Lookup::Exact,
        };
        Self { path: parts, lookup, value: value.into() }
    }

    /// Inverse of `parse`. `exact` is spelled out when the last segment reads as a lookup.
    pub fn key(&self) -> String {
        let mut k = self.path.join("__");
        let shadowed = self.path.len() > 1 && self.path.last().and_then(|t| Lookup::from_token(t)).is_some();
        if self.lookup != Lookup::Exact || shadowed { k.push_str("__"); k.push_str(self.lookup.as_str()); }
        k
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "{}={}", self.key(), self.value) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Cond(Condition),
    Group(Filter),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub connector: Connector,
    #[serde(default)]
    pub negated: bool,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Filter {
    /// Single keyword condition.
    pub fn q<V: Into<Value>>(key: &str, value: V) -> Self { Self::cond(Condition::parse(key, value)) }

    pub fn cond(cond: Condition) -> Self { Self { connector: Connector::And, negated: false, children: vec![Node::Cond(cond)] } }

    /// Conjunction of keyword conditions, like several keyword arguments to one filter call.
    pub fn all<I, V>(pairs: I) -> Self where I: IntoIterator<Item = (&'static str, V)>, V: Into<Value> {
        let children = pairs.into_iter().map(|(k, v)| Node::Cond(Condition::parse(k, v))).collect();
        Self { connector: Connector::And, negated: false, children }
    }

    /// An empty, non-negated filter matches everything.
    pub fn is_empty(&self) -> bool { self.children.is_empty() }

    fn matches_all(&self) -> bool { self.is_empty() && !self.negated }

    pub fn and(self, other: Filter) -> Filter { self.combine(other, Connector::And) }

    pub fn or(self, other: Filter) -> Filter { self.combine(other, Connector::Or) }

    pub fn negate(mut self) -> Filter { self.negated = !self.negated; self }

    // Match-all is the identity for AND and absorbs OR.
    fn combine(self, other: Filter, connector: Connector) -> Filter {
        match connector {
            Connector::And if other.matches_all() => return self,
            Connector::And if self.matches_all() => return other,
            Connector::Or if self.matches_all() => return self,
            Connector::Or if other.matches_all() => return other,
            _ => {}
        }
        let mut out = Filter { connector, negated: false, children: Vec::with_capacity(2) };
        out.absorb(self);
        out.absorb(other);
        out
    }

    // Splice children in when that cannot change meaning, otherwise nest.
    fn absorb(&mut self, f: Filter) {
        if !f.negated && (f.connector == self.connector || f.children.len() == 1) {
            self.children.extend(f.children);
        } else {
            self.children.push(Node::Group(f));
        }
    }

    /// Every leaf condition, depth first.
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        for child in self.children.iter() {
            match child {
                Node::Cond(c) => out.push(c),
                Node::Group(g) => g.collect_conditions(out),
            }
        }
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.negated { write!(f, "NOT ")?; }
        let conn = match self.connector { Connector::And => "AND", Connector::Or => "OR" };
        write!(f, "({}:", conn)?;
        for (i, child) in self.children.iter().enumerate() {
            write!(f, "{}", if i == 0 { " " } else { ", " })?;
            match child {
                Node::Cond(c) => write!(f, "{}", c)?,
                Node::Group(g) => write!(f, "{}", g)?,
            }
        }
        write!(f, ")")
    }
}

impl BitAnd for Filter {
    type Output = Filter;
    fn bitand(self, rhs: Filter) -> Filter { self.and(rhs) }
}

impl BitOr for Filter {
    type Output = Filter;
    fn bitor(self, rhs: Filter) -> Filter { self.or(rhs) }
}

impl Not for Filter {
    type Output = Filter;
    fn not(self) -> Filter { self.negate() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_parsing() {
        let c = Condition::parse("owner__name__icontains", "bo");
        assert_eq!(c.path, vec!["owner", "name"]);
        assert_eq!(c.lookup, Lookup::IContains);
        let c = Condition::parse("allergic_users", 1);
        assert_eq!(c.path, vec!["allergic_users"]);
        assert_eq!(c.lookup, Lookup::Exact);
        // unknown trailing token is one more attribute hop
        let c = Condition::parse("owner__nickname", "x");
        assert_eq!(c.path, vec!["owner", "nickname"]);
        assert_eq!(c.lookup, Lookup::Exact);
        // a bare field that happens to share a lookup's name stays a field
        let c = Condition::parse("year", 2020);
        assert_eq!(c.path, vec!["year"]);
        assert_eq!(c.key(), "year");
    }

    #[test]
    fn combination_flattens_same_connector() {
        let f = Filter::q("a", 1) & Filter::q("b", 2) & Filter::q("c", 3);
        assert_eq!(f.connector, Connector::And);
        assert_eq!(f.children.len(), 3);
        let g = f.clone() | Filter::q("d", 4);
        assert_eq!(g.connector, Connector::Or);
        assert_eq!(g.children.len(), 2);
        assert!(matches!(g.children[0], Node::Group(_)));
    }

    #[test]
    fn negation_toggles() {
        let f = Filter::q("a", 1);
        let n = !f.clone();
        assert!(n.negated);
        assert_eq!(!n, f);
    }

    #[test]
    fn empty_is_identity_for_and() {
        let f = Filter::q("a", 1);
        assert_eq!(Filter::default() & f.clone(), f);
        assert_eq!(f.clone() & Filter::default(), f);
    }

    #[test]
    fn empty_absorbs_or() {
        let f = Filter::q("a", 1);
        assert_eq!(Filter::default() | f.clone(), Filter::default());
        assert_eq!(f.clone() | Filter::default(), Filter::default());
        // a negated empty filter matches nothing and is not shortcut
        let none = !Filter::default();
        assert_eq!((none | f.clone()).children.len(), 2);
    }

    #[test]
    fn lookup_named_fields_round_trip() {
        let c = Condition::new(["created", "year"], Lookup::Exact, 2020);
        assert_eq!(c.key(), "created__year__exact");
        assert_eq!(Condition::parse(&c.key(), 2020), c);
        let c = Condition::new(["created", "year"], Lookup::Gt, 2020);
        assert_eq!(Condition::parse(&c.key(), 2020), c);
        assert_eq!(Condition::parse("year", 1).key(), "year");
        assert_eq!(Condition::parse("owner__name", "x").key(), "owner__name");
    }

    #[test]
    fn display_and_serde() {
        let f = Filter::q("name__startswith", "ba") | !Filter::q("allergic_users", 3);
        assert_eq!(f.to_string(), "(OR: name__startswith='ba', NOT (AND: allergic_users=3))");
        let json = serde_json::to_string(&f).unwrap();
        let back: Filter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
        assert_eq!(f.conditions().len(), 2);
    }
}
