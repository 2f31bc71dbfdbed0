//! In-memory evaluation of a `Filter` against one loaded object graph.
//!
//! Semantics follow what a relational backend does with the same expression:
//! - a path walks relations; multi-valued relations fan out to every related row
//! - absent attributes and nulls drop out of the candidate set instead of propagating
//! - a condition holds when any candidate satisfies it, except `isnull`, which tests
//!   whether the candidate set is empty
//! - AND/OR stop at the first deciding child, and a node's negation applies to the node
//!   result, never to individual candidates

use tracing::trace;

use crate::entity::{Attr, Entity};
use crate::error::PermResult;
use crate::filter::{Condition, Connector, Filter, Node};
use crate::lookup::Lookup;
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEvaluator;

impl FilterEvaluator {
    pub fn evaluate(obj: &dyn Entity, filter: &Filter) -> PermResult<bool> { eval_filter(obj, filter) }

    /// Candidate values reached by walking `path` from `obj`; related entities appear as
    /// `Value::Ref` keys.
    pub fn candidates(obj: &dyn Entity, path: &[String]) -> Vec<Value> {
        let mut out = Vec::new();
        collect_entity(obj, path, &mut out);
        out
    }
}

fn eval_filter(obj: &dyn Entity, filter: &Filter) -> PermResult<bool> {
    let mut result = true;
    if !filter.children.is_empty() {
        result = match filter.connector {
            Connector::And => {
                let mut all = true;
                for child in filter.children.iter() {
                    if !eval_node(obj, child)? { all = false; break; }
                }
                all
            }
            Connector::Or => {
                let mut any = false;
                for child in filter.children.iter() {
                    if eval_node(obj, child)? { any = true; break; }
                }
                any
            }
        };
    }
    Ok(result != filter.negated)
}

fn eval_node(obj: &dyn Entity, node: &Node) -> PermResult<bool> {
    match node {
        Node::Cond(c) => eval_condition(obj, c),
        Node::Group(g) => eval_filter(obj, g),
    }
}

fn eval_condition(obj: &dyn Entity, cond: &Condition) -> PermResult<bool> {
    cond.lookup.check_value(&cond.value)?;
    let candidates = FilterEvaluator::candidates(obj, &cond.path);
    trace!(target: "rulegate::eval", "{} on {:?}: {} candidate(s)", cond, obj.key(), candidates.len());
    match cond.lookup {
        Lookup::IsNull => Ok(candidates.is_empty() == cond.value.as_bool().unwrap_or(true)),
        Lookup::Exact if cond.value.is_null() => Ok(candidates.is_empty()),
        lookup => {
            for c in candidates.iter() {
                if lookup.test(c, &cond.value)? { return Ok(true); }
            }
            Ok(false)
        }
    }
}

fn collect_entity(entity: &dyn Entity, path: &[String], out: &mut Vec<Value>) {
    let Some((head, rest)) = path.split_first() else {
        out.push(Value::Ref(entity.key()));
        return;
    };
    match entity.attr(head) {
        Attr::Absent => {}
        Attr::Value(v) => collect_value(v, rest, out),
        Attr::One(e) => collect_entity(e.as_ref(), rest, out),
        Attr::Many(es) => {
            for e in es.iter() { collect_entity(e.as_ref(), rest, out); }
        }
    }
}

fn collect_value(v: Value, rest: &[String], out: &mut Vec<Value>) {
    match v {
        Value::Null => {}
        Value::List(items) => {
            for item in items { collect_value(item, rest, out); }
        }
        // scalars have no attributes to walk into
        _ if !rest.is_empty() => {}
        v => out.push(v),
    }
}
