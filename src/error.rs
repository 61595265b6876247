//! Crate-wide error taxonomy.
//!
//! Errors are grouped by kind, not by origin:
//!
//! | Error | Meaning | Fatal |
//! |-------|---------|-------|
//! | [`SimError::InvalidTransition`] | A transition failed a validator | No — discarded from the tick |
//! | [`SimError::InconsistentState`] | An engine invariant broke | Yes — engine defect |
//! | [`SimError::InvalidValue`] | Malformed input to a utility | Yes for the call |
//! | [`SimError::NotImplemented`] | Unsupported variant reached | Yes for the run |
//!
//! Validators report `InvalidTransition` non-fatally: the engine discards the
//! offending transition and re-derives the possible set. `InconsistentState`
//! aborts the run — it indicates a defect in the engine itself, never a user
//! error. No error is used as control flow across module boundaries.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;

/// Simulation core errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimError {
    /// A generated or requested transition failed a precondition.
    ///
    /// Recoverable: the transition is dropped and the possible set
    /// re-derived on the next tick.
    #[error("invalid transition on '{component_id}': {reason}")]
    InvalidTransition {
        /// Component the transition addressed.
        component_id: String,
        /// Why the validator rejected it.
        reason: String,
    },

    /// An internal invariant no longer holds. Engine bug, not user error.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// Malformed input to a utility (unknown id, bad parameter).
    #[error("invalid value '{key}': {message}")]
    InvalidValue {
        /// Offending key or id.
        key: String,
        /// What was expected.
        message: String,
    },

    /// A duration or transition variant with no implementation yet.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

impl SimError {
    /// Builds an [`SimError::InvalidTransition`].
    pub fn invalid_transition(component_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTransition {
            component_id: component_id.into(),
            reason: reason.into(),
        }
    }

    /// Builds an [`SimError::InvalidValue`].
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether the engine may continue after discarding the cause.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_is_recoverable() {
        let err = SimError::invalid_transition("m-0", "machine not idle");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("m-0"));
    }

    #[test]
    fn test_inconsistent_state_is_fatal() {
        let err = SimError::InconsistentState("job j-1 duplicated".into());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_invalid_value_message() {
        let err = SimError::invalid_value("b-9", "buffer id not found");
        assert_eq!(
            err.to_string(),
            "invalid value 'b-9': buffer id not found"
        );
    }
}
