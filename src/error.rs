use thiserror::Error;

use crate::types::ValueKind;

/// Failure raised by a compatibility or disambiguation rule while executing.
///
/// Rules are user-supplied; any failure they report is treated as fatal
/// configuration breakage and wrapped into [`MatchError::RuleFailure`] by the
/// engine — never retried, never swallowed.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RuleError(pub String);

impl RuleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors produced by the matching engine.
///
/// Note that "no compatible candidate" and "still ambiguous" are *not*
/// errors: both are ordinary return values (empty and multi-element lists).
#[derive(Debug, Error)]
pub enum MatchError {
    /// Invalid engine configuration.
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    /// A value of the wrong kind was bound to an attribute.
    #[error("attribute `{attribute}` holds {expected} values, got a {actual} value")]
    TypeMismatch {
        attribute: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// A rule chain failed while matching attribute values; names the
    /// offending strategy so the misconfigured schema entry is identifiable.
    #[error("unexpected error matching values for attribute `{attribute}` with strategy `{strategy}`")]
    RuleFailure {
        attribute: String,
        strategy: String,
        #[source]
        source: RuleError,
    },

    /// Event payload serialization failed.
    #[error("failed to serialize event payload: {0}")]
    Serialization(#[from] serde_json::Error),
}
