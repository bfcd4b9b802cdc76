//! Error handling for robot description loading

use std::io;

use thiserror::Error;

use crate::error::KinematicsError;

/// Unified error to report failures while reading a robot description.
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("IO Error: {0}")]
    IoError(#[from] io::Error),

    #[error("Parse Error: {0}")]
    ParseError(String),

    #[error("Invalid Length of {field}: expected {expected}, found {found}")]
    InvalidLength { field: String, expected: usize, found: usize },

    #[error("Kinematics Configuration Error: {0}")]
    KinematicsConfigurationError(#[from] KinematicsError),
}
