//! Error taxonomy of the kinematics core.
//!
//! Limit violations are normally reported as messages on the computation results and
//! only become errors where a caller asks for strict validation. The other kinds are
//! returned where no value can be produced (for instance, an inverse kinematics
//! candidate for a target outside the reach envelope).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicsError {
    /// An axis value lies outside its declared interval.
    #[error("{kind} Value {index} is not in Range.")]
    LimitViolation { kind: AxisKind, index: usize },

    /// The robot layout or the external axes cannot be handled by the closed-form solver.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// The target cannot be reached (empty sphere or circle intersection).
    #[error("Unreachable target: {0}")]
    Unreachable(String),

    /// Malformed geometric input: zero vectors, non finite values, bad indices.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Distinguishes the robot's own axes from external ones in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Internal,
    External,
}

impl std::fmt::Display for AxisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisKind::Internal => write!(f, "Internal Axis"),
            AxisKind::External => write!(f, "External Axis"),
        }
    }
}

impl KinematicsError {
    /// Limit violation for the axis at zero-based `index`; messages use 1-based numbering.
    pub fn limit_violation(kind: AxisKind, index: usize) -> Self {
        KinematicsError::LimitViolation { kind, index: index + 1 }
    }
}
