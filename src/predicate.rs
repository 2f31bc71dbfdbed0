//! Composable access predicates.
//!
//! A predicate is a function of the actor and a target. The target is either a single
//! loaded object (decide), an entity kind (bulk filtering) or nothing (global checks), never
//! a mix. The result is a `Decision`: a plain boolean, or a `Filter` describing which
//! objects pass. Predicates combine with `&`, `|` and `!`; boolean results short-circuit and
//! filter results compose into a single filter tree.

use std::fmt::{Debug, Formatter};
use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

use crate::actor::Actor;
use crate::entity::Entity;
use crate::error::{PermError, PermResult};
use crate::filter::Filter;
use crate::rules::Rules;

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Boolean(bool),
    Filter(Filter),
}

impl Decision {
    pub fn and(self, other: Decision) -> Decision {
        match (self, other) {
            (Decision::Boolean(false), _) | (_, Decision::Boolean(false)) => Decision::Boolean(false),
            (Decision::Boolean(true), o) => o,
            (s, Decision::Boolean(true)) => s,
            (Decision::Filter(a), Decision::Filter(b)) => Decision::Filter(a & b),
        }
    }

    pub fn or(self, other: Decision) -> Decision {
        match (self, other) {
            (Decision::Boolean(true), _) | (_, Decision::Boolean(true)) => Decision::Boolean(true),
            (Decision::Boolean(false), o) => o,
            (s, Decision::Boolean(false)) => s,
            (Decision::Filter(a), Decision::Filter(b)) => Decision::Filter(a | b),
        }
    }

    pub fn negate(self) -> Decision {
        match self {
            Decision::Boolean(b) => Decision::Boolean(!b),
            Decision::Filter(f) => Decision::Filter(!f),
        }
    }

    pub fn is_true(&self) -> bool { matches!(self, Decision::Boolean(true)) }

    pub fn is_false(&self) -> bool { matches!(self, Decision::Boolean(false)) }

    pub fn as_filter(&self) -> Option<&Filter> { if let Decision::Filter(f) = self { Some(f) } else { None } }
}

impl From<bool> for Decision { fn from(b: bool) -> Self { Decision::Boolean(b) } }
impl From<Filter> for Decision { fn from(f: Filter) -> Self { Decision::Filter(f) } }

/// What a predicate is asked about.
#[derive(Clone, Copy)]
pub enum Target<'a> {
    Global,
    Object(&'a dyn Entity),
    Kind(&'a str),
}

impl<'a> Target<'a> {
    pub fn object(&self) -> Option<&'a dyn Entity> { if let Target::Object(o) = self { Some(*o) } else { None } }

    /// Entity kind of the target, whether given directly or through the object.
    pub fn kind(&self) -> Option<&'a str> {
        match *self {
            Target::Global => None,
            Target::Object(o) => Some(o.kind()),
            Target::Kind(k) => Some(k),
        }
    }

    pub fn is_global(&self) -> bool { matches!(self, Target::Global) }
}

impl Debug for Target<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Global => write!(f, "Global"),
            Target::Object(o) => write!(f, "Object({})", o.key()),
            Target::Kind(k) => write!(f, "Kind({})", k),
        }
    }
}

/// Evaluation context threaded through nested predicates.
#[derive(Clone, Copy)]
pub(crate) struct Scope<'a> {
    pub actor: &'a Actor,
    pub target: Target<'a>,
    pub rules: Option<&'a Rules>,
    pub depth: usize,
}

impl<'a> Scope<'a> {
    pub fn new(actor: &'a Actor, target: Target<'a>, rules: Option<&'a Rules>) -> Self { Self { actor, target, rules, depth: 0 } }

    fn deeper(&self) -> Self { Self { depth: self.depth + 1, ..*self } }
}

type EvalFn = dyn Fn(&Actor, Target<'_>) -> PermResult<Decision> + Send + Sync;

enum Inner {
    Const(bool),
    Func(Box<EvalFn>),
    And(Predicate, Predicate),
    Or(Predicate, Predicate),
    Not(Predicate),
    Delegate(String),
}

#[derive(Clone)]
pub struct Predicate(Arc<Inner>);

impl Predicate {
    pub fn constant(value: bool) -> Self { Predicate(Arc::new(Inner::Const(value))) }

    pub fn always() -> Self { Self::constant(true) }

    pub fn never() -> Self { Self::constant(false) }

    pub fn new<F>(f: F) -> Self where F: Fn(&Actor, Target<'_>) -> Decision + Send + Sync + 'static {
        Self::fallible(move |a, t| Ok(f(a, t)))
    }

    pub fn fallible<F>(f: F) -> Self where F: Fn(&Actor, Target<'_>) -> PermResult<Decision> + Send + Sync + 'static {
        Predicate(Arc::new(Inner::Func(Box::new(f))))
    }

    /// Boolean test over actor and target.
    pub fn test<F>(f: F) -> Self where F: Fn(&Actor, Target<'_>) -> bool + Send + Sync + 'static {
        Self::new(move |a, t| Decision::Boolean(f(a, t)))
    }

    /// Test that looks only at the actor, for permissions not tied to an object.
    pub fn global<F>(f: F) -> Self where F: Fn(&Actor) -> bool + Send + Sync + 'static {
        Self::new(move |a, _| Decision::Boolean(f(a)))
    }

    /// Per-object test. It has no collection form, so using it to filter a collection is a
    /// configuration error; pair it with a filter through `dual` for that.
    pub fn object<F>(f: F) -> Self where F: Fn(&Actor, &dyn Entity) -> bool + Send + Sync + 'static {
        Self::fallible(move |a, t| match t {
            Target::Object(o) => Ok(Decision::Boolean(f(a, o))),
            Target::Global => Ok(Decision::Boolean(false)),
            Target::Kind(k) => Err(PermError::config(format!("object-only predicate cannot filter '{}' collections", k))),
        })
    }

    /// Declarative predicate: the filter is used for collections and evaluated in memory
    /// for single objects.
    pub fn filter<F>(f: F) -> Self where F: Fn(&Actor) -> Filter + Send + Sync + 'static {
        Self::new(move |a, _| Decision::Filter(f(a)))
    }

    /// Object test for single checks paired with an equivalent filter for collections.
    pub fn dual<T, Q>(test: T, q: Q) -> Self
    where
        T: Fn(&Actor, &dyn Entity) -> bool + Send + Sync + 'static,
        Q: Fn(&Actor) -> Filter + Send + Sync + 'static,
    {
        Self::new(move |a, t| match t {
            Target::Object(o) => Decision::Boolean(test(a, o)),
            Target::Kind(_) => Decision::Filter(q(a)),
            Target::Global => Decision::Boolean(false),
        })
    }

    /// Defer to whatever the rule set resolves for `perm` on the same target kind.
    pub fn delegate(perm: &str) -> Self { Predicate(Arc::new(Inner::Delegate(perm.to_string()))) }

    pub fn as_constant(&self) -> Option<bool> { if let Inner::Const(b) = *self.0 { Some(b) } else { None } }

    /// Evaluate outside any rule set; delegating predicates fail.
    pub fn evaluate(&self, actor: &Actor, target: Target<'_>) -> PermResult<Decision> {
        self.eval_scoped(&Scope::new(actor, target, None))
    }

    pub(crate) fn eval_scoped(&self, scope: &Scope<'_>) -> PermResult<Decision> {
        match &*self.0 {
            Inner::Const(b) => Ok(Decision::Boolean(*b)),
            Inner::Func(f) => f(scope.actor, scope.target),
            Inner::And(p, q) => {
                let left = p.eval_scoped(scope)?;
                if left.is_false() { return Ok(left); }
                Ok(left.and(q.eval_scoped(scope)?))
            }
            Inner::Or(p, q) => {
                let left = p.eval_scoped(scope)?;
                if left.is_true() { return Ok(left); }
                Ok(left.or(q.eval_scoped(scope)?))
            }
            Inner::Not(p) => Ok(p.eval_scoped(scope)?.negate()),
            Inner::Delegate(perm) => {
                let rules = scope.rules.ok_or_else(|| PermError::config(format!("predicate delegating to '{}' evaluated without a rule set", perm)))?;
                let max = rules.config().max_delegation_depth;
                if scope.depth >= max {
                    return Err(PermError::config(format!("delegation to '{}' exceeded depth {} (cyclic rules?)", perm, max)));
                }
                rules.resolve(perm, scope.target.kind()).eval_scoped(&scope.deeper())
            }
        }
    }

    pub fn and(&self, other: &Predicate) -> Predicate {
        match (self.as_constant(), other.as_constant()) {
            (Some(false), _) => Predicate::never(),
            (Some(true), _) => other.clone(),
            (_, Some(true)) => self.clone(),
            _ => Predicate(Arc::new(Inner::And(self.clone(), other.clone()))),
        }
    }

    pub fn or(&self, other: &Predicate) -> Predicate {
        match (self.as_constant(), other.as_constant()) {
            (Some(true), _) => Predicate::always(),
            (Some(false), _) => other.clone(),
            (_, Some(false)) => self.clone(),
            _ => Predicate(Arc::new(Inner::Or(self.clone(), other.clone()))),
        }
    }

    pub fn negate(&self) -> Predicate {
        match &*self.0 {
            Inner::Const(b) => Predicate::constant(!b),
            Inner::Not(p) => p.clone(),
            _ => Predicate(Arc::new(Inner::Not(self.clone()))),
        }
    }
}

impl Debug for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &*self.0 {
            Inner::Const(b) => write!(f, "{}", b),
            Inner::Func(_) => write!(f, "fn"),
            Inner::And(p, q) => write!(f, "({:?} & {:?})", p, q),
            Inner::Or(p, q) => write!(f, "({:?} | {:?})", p, q),
            Inner::Not(p) => write!(f, "!{:?}", p),
            Inner::Delegate(perm) => write!(f, "perm({})", perm),
        }
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;
    fn bitand(self, rhs: Predicate) -> Predicate { self.and(&rhs) }
}

impl BitAnd for &Predicate {
    type Output = Predicate;
    fn bitand(self, rhs: &Predicate) -> Predicate { self.and(rhs) }
}

impl BitOr for Predicate {
    type Output = Predicate;
    fn bitor(self, rhs: Predicate) -> Predicate { self.or(&rhs) }
}

impl BitOr for &Predicate {
    type Output = Predicate;
    fn bitor(self, rhs: &Predicate) -> Predicate { self.or(rhs) }
}

impl Not for Predicate {
    type Output = Predicate;
    fn not(self) -> Predicate { self.negate() }
}

impl Not for &Predicate {
    type Output = Predicate;
    fn not(self) -> Predicate { self.negate() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(result: bool, hits: Arc<AtomicUsize>) -> Predicate {
        Predicate::test(move |_, _| { hits.fetch_add(1, Ordering::SeqCst); result })
    }

    fn q(key: &'static str) -> Predicate { Predicate::filter(move |_| Filter::q(key, 1)) }

    #[test]
    fn and_short_circuits_on_false() {
        let hits = Arc::new(AtomicUsize::new(0));
        let p = counting(false, hits.clone()) & counting(true, hits.clone());
        let alice = Actor::new("alice");
        assert_eq!(p.evaluate(&alice, Target::Global).unwrap(), Decision::Boolean(false));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn or_short_circuits_on_true() {
        let hits = Arc::new(AtomicUsize::new(0));
        let p = counting(true, hits.clone()) | counting(false, hits.clone());
        assert!(p.evaluate(&Actor::new("a"), Target::Global).unwrap().is_true());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn booleans_absorb_filters() {
        let a = Actor::new("a");
        let t = Target::Kind("food");
        assert_eq!((Predicate::always() & q("x")).evaluate(&a, t).unwrap(), Decision::Filter(Filter::q("x", 1)));
        assert_eq!((q("x") & Predicate::test(|_, _| true)).evaluate(&a, t).unwrap(), Decision::Filter(Filter::q("x", 1)));
        assert!((q("x") & Predicate::test(|_, _| false)).evaluate(&a, t).unwrap().is_false());
        assert!((q("x") | Predicate::test(|_, _| true)).evaluate(&a, t).unwrap().is_true());
        assert_eq!((Predicate::test(|_, _| false) | q("x")).evaluate(&a, t).unwrap(), Decision::Filter(Filter::q("x", 1)));
        assert_eq!((q("x") & q("y")).evaluate(&a, t).unwrap(), Decision::Filter(Filter::q("x", 1) & Filter::q("y", 1)));
        assert_eq!((!q("x")).evaluate(&a, t).unwrap(), Decision::Filter(!Filter::q("x", 1)));
    }

    #[test]
    fn constants_match_functions() {
        let a = Actor::new("a");
        for v in [true, false] {
            let c = Predicate::constant(v);
            let f = Predicate::test(move |_, _| v);
            for other in [Predicate::always(), Predicate::never(), Predicate::test(|_, _| true)] {
                assert_eq!((&c & &other).evaluate(&a, Target::Global).unwrap(), (&f & &other).evaluate(&a, Target::Global).unwrap());
                assert_eq!((&c | &other).evaluate(&a, Target::Global).unwrap(), (&f | &other).evaluate(&a, Target::Global).unwrap());
            }
            assert_eq!((!&c).evaluate(&a, Target::Global).unwrap(), (!&f).evaluate(&a, Target::Global).unwrap());
        }
    }

    #[test]
    fn and_or_commute() {
        use crate::entity::Record;
        use crate::evaluator::FilterEvaluator;

        let a = Actor::new("a");
        let apple = Record::new("food", 1).with("name", "apple");
        let pear = Record::new("food", 2).with("name", "pear");
        let named = |n: &'static str| Predicate::filter(move |_| Filter::q("name", n));
        let operands = [
            Predicate::always(),
            Predicate::never(),
            Predicate::test(|_, _| true),
            Predicate::test(|_, _| false),
            named("apple"),
            named("pear"),
            !named("apple"),
            Predicate::filter(|_| Filter::default()),
        ];
        // reduce a decision to one outcome per sample object
        let outcomes = |d: Decision| -> Vec<bool> {
            [&apple, &pear].iter().map(|o| match &d {
                Decision::Boolean(b) => *b,
                Decision::Filter(f) => FilterEvaluator::evaluate(*o, f).unwrap(),
            }).collect()
        };
        for target in [Target::Object(&apple), Target::Kind("food")] {
            for p in operands.iter() {
                for q in operands.iter() {
                    let run = |pred: Predicate| {
                        let d = pred.evaluate(&a, target).unwrap();
                        match target {
                            Target::Object(o) => vec![match d {
                                Decision::Boolean(b) => b,
                                Decision::Filter(f) => FilterEvaluator::evaluate(o, &f).unwrap(),
                            }],
                            _ => outcomes(d),
                        }
                    };
                    assert_eq!(run(p & q), run(q & p), "{:?} & {:?} on {:?}", p, q, target);
                    assert_eq!(run(p | q), run(q | p), "{:?} | {:?} on {:?}", p, q, target);
                }
            }
        }
    }

    #[test]
    fn double_negation() {
        let a = Actor::new("a");
        let p = Predicate::test(|a, _| a.id == "a");
        assert_eq!((!!p.clone()).evaluate(&a, Target::Global).unwrap(), p.evaluate(&a, Target::Global).unwrap());
    }

    #[test]
    fn delegate_needs_rules() {
        let err = Predicate::delegate("eat").evaluate(&Actor::new("a"), Target::Global).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn object_predicate_refuses_collections() {
        let p = Predicate::object(|_, _| true);
        assert!(p.evaluate(&Actor::new("a"), Target::Kind("food")).unwrap_err().is_config());
        assert!(p.evaluate(&Actor::new("a"), Target::Global).unwrap().is_false());
    }
}
