//! Unified error model for rule registration and evaluation.
//! Denial is never an error: a refused check is `Ok(false)`, an empty collection or
//! `Access::Forbidden`. Everything here is a failure the caller must see.

use thiserror::Error;

use crate::lookup::Lookup;

#[derive(Debug, Error)]
pub enum PermError {
    /// Malformed registration or a rule set that cannot be evaluated as configured.
    #[error("{0}")]
    Config(String),
    #[error("unsupported lookup '{0}'")]
    UnsupportedLookup(String),
    #[error("invalid value for lookup '{lookup}': {message}")]
    InvalidValue { lookup: String, message: String },
    #[error("unknown field '{field}' on '{kind}'")]
    UnknownField { kind: String, field: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PermError {
    pub fn code_str(&self) -> &'static str {
        match self {
            PermError::Config(_) => "config_error",
            PermError::UnsupportedLookup(_) => "unsupported_lookup",
            PermError::InvalidValue { .. } => "invalid_value",
            PermError::UnknownField { .. } => "unknown_field",
            PermError::Json(_) => "json_error",
            PermError::Io(_) => "io_error",
        }
    }

    pub fn config<S: Into<String>>(msg: S) -> Self { PermError::Config(msg.into()) }
    pub fn invalid_value<S: Into<String>>(lookup: Lookup, msg: S) -> Self { PermError::InvalidValue { lookup: lookup.as_str().to_string(), message: msg.into() } }
    pub fn unknown_field<S: Into<String>>(kind: S, field: S) -> Self { PermError::UnknownField { kind: kind.into(), field: field.into() } }

    /// True for errors raised while registering or resolving rules rather than while
    /// evaluating a filter against data.
    pub fn is_config(&self) -> bool { matches!(self, PermError::Config(_)) }
}

pub type PermResult<T> = Result<T, PermError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
