//! Allow/deny permission rules over composable predicates.
//!
//! A rule set maps `(permission, kind)` to predicates. A predicate answers with a boolean
//! or with a `Filter`; the same filter decides a single loaded object in memory and narrows
//! a collection when handed to its backend.

pub mod value;
pub mod lookup;
pub mod entity;
pub mod model;
pub mod filter;
pub mod evaluator;
pub mod actor;
pub mod predicate;
pub mod builtins;
pub mod rules;
pub mod collection;
pub mod authorizer;
pub mod roles;
pub mod config;
pub mod logging;
pub mod error;
pub mod cli;

pub use actor::{Actor, GlobalPermissions};
pub use authorizer::{Access, Authorizer, ObjectPerms};
pub use collection::{Collection, EntitySet};
pub use config::{EffectiveConfig, PermOverride, RulesConfig};
pub use entity::{Attr, Entity, EntityRef, Record};
pub use error::{PermError, PermResult};
pub use evaluator::FilterEvaluator;
pub use filter::{Condition, Connector, Filter, Node};
pub use lookup::Lookup;
pub use model::{Model, Schema};
pub use predicate::{Decision, Predicate, Target};
pub use roles::{Role, RoleAuthorizer, RoleProvider};
pub use rules::Rules;
pub use value::{EntityKey, Value};

// Test-only printing helper: expands to eprintln! in test and debug builds.
// Usage: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds tprintln! keeps its format checks and emits nothing.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        if false { let _ = format!($($arg)*); }
    });
}
