use thiserror::Error;

/// Reasons an analysis payload is rejected by the normalizer.
///
/// Both variants get the same treatment at the user boundary; they are kept
/// apart so that provider contract bugs can be told from malformed payloads
/// in the logs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssessmentError {
    /// A field is missing, has the wrong type, or violates an enum or range
    /// constraint.
    #[error("Schema violation at '{field}': {reason}")]
    SchemaViolation { field: String, reason: String },

    /// The payload is well typed but internally inconsistent.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl AssessmentError {
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AssessmentError::SchemaViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        AssessmentError::InvariantViolation(message.into())
    }

    pub fn is_schema_violation(&self) -> bool {
        matches!(self, AssessmentError::SchemaViolation { .. })
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, AssessmentError::InvariantViolation(_))
    }
}
