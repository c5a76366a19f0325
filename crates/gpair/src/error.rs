//! Error types for objective construction, configuration and evaluation.

/// Errors surfaced by the objective subsystem.
///
/// None of these are retried internally: a bad objective name or parameter
/// is fatal at construction/configure time, and a label outside a family's
/// domain fails the whole gradient batch before any partial result is
/// produced. Numeric overflow in the loss kernels is guarded internally and
/// never surfaces as an error (or as a NaN).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ObjectiveError {
    /// The factory name matched no registered loss family.
    #[error("unknown objective '{0}'")]
    UnknownObjective(String),

    /// A configuration value failed to parse or is out of range.
    #[error("invalid value '{value}' for parameter '{name}': {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// A label violates the loss family's domain.
    ///
    /// Raised after scanning the whole batch and before any gradient is
    /// computed, so a single bad label deterministically fails the call.
    #[error("label {label} at row {row} violates {objective} domain: {constraint}")]
    LabelDomain {
        objective: &'static str,
        constraint: &'static str,
        label: f32,
        row: usize,
    },

    /// An argument to `prob_to_margin` is outside the inverse link's range.
    #[error("value {value} outside valid range for prob_to_margin: {constraint}")]
    Domain { value: f32, constraint: &'static str },

    /// Prediction/label/weight sequences have inconsistent lengths.
    #[error("length mismatch: {what} has {got} entries, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
}
