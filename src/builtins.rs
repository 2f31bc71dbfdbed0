//! Stock predicates for common rule shapes.

use crate::filter::Filter;
use crate::predicate::Predicate;

/// Actor holds `perm` in its global permission set, whatever the target.
pub fn has_global_perm(perm: &str) -> Predicate {
    let perm = perm.to_string();
    Predicate::global(move |a| a.has_global_perm(&perm))
}

/// Whatever the registry resolves for `perm` on the same kind, e.g. `edit` implying `view`.
pub fn has_object_perm(perm: &str) -> Predicate { Predicate::delegate(perm) }

pub fn is_superuser() -> Predicate { Predicate::global(|a| a.is_superuser()) }

/// Objects whose `field` relation (or key path) points at the actor.
pub fn owned_by(field: &str) -> Predicate {
    let field = field.to_string();
    Predicate::filter(move |a| Filter::q(&field, a))
}
