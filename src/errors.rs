//! Centralized error handling for sedicube
//!
//! This module provides structured error types to replace the generic `Box<dyn Error>`
//! pattern, enabling better error context and type safety.

use std::fmt;

/// Main error type for sedicube operations
#[derive(Debug)]
pub enum SedicubeError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Variable not found in cube or data source
    VariableNotFound { var: String },

    /// Variable shape does not match the shared cube axes
    ShapeMismatch {
        var: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Invalid domain parameter (e.g. non-positive `dz`)
    InvalidParameter { param: String, message: String },

    /// Invalid slice specification or out-of-range index
    InvalidSlice { message: String },

    /// Path specification resolved to no grid cells
    EmptyPath,

    /// Stratigraphy has not been computed on the source cube.
    ///
    /// Recoverable: callers may fall back to the spacetime view, or trigger
    /// `DataCube::compute_preservation` and retry.
    StratigraphyNotComputed,

    /// A bulk stratigraphy computation was cancelled by the caller
    Cancelled,

    /// Thread pool configuration error
    ThreadPoolError(String),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Generic error
    Generic(String),
}

impl fmt::Display for SedicubeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SedicubeError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            SedicubeError::IoError(e) => write!(f, "I/O error: {}", e),
            SedicubeError::VariableNotFound { var } => {
                write!(f, "Variable '{}' not found in cube", var)
            }
            SedicubeError::ShapeMismatch {
                var,
                expected,
                actual,
            } => write!(
                f,
                "Variable '{}' has shape {:?}, expected {:?}",
                var, actual, expected
            ),
            SedicubeError::InvalidParameter { param, message } => {
                write!(f, "Invalid parameter '{}': {}", param, message)
            }
            SedicubeError::InvalidSlice { message } => {
                write!(f, "Invalid slice specification: {}", message)
            }
            SedicubeError::EmptyPath => write!(f, "Path specification resolved to no grid cells"),
            SedicubeError::StratigraphyNotComputed => {
                write!(f, "Stratigraphy has not been computed for this cube")
            }
            SedicubeError::Cancelled => write!(f, "Computation cancelled"),
            SedicubeError::ThreadPoolError(msg) => write!(f, "Thread pool error: {}", msg),
            SedicubeError::ArrayError(e) => write!(f, "Array error: {}", e),
            SedicubeError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SedicubeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SedicubeError::NetCDFError(e) => Some(e),
            SedicubeError::IoError(e) => Some(e),
            SedicubeError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for SedicubeError {
    fn from(error: netcdf::Error) -> Self {
        SedicubeError::NetCDFError(error)
    }
}

impl From<std::io::Error> for SedicubeError {
    fn from(error: std::io::Error) -> Self {
        SedicubeError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for SedicubeError {
    fn from(error: ndarray::ShapeError) -> Self {
        SedicubeError::ArrayError(error)
    }
}

impl From<String> for SedicubeError {
    fn from(error: String) -> Self {
        SedicubeError::Generic(error)
    }
}

impl From<&str> for SedicubeError {
    fn from(error: &str) -> Self {
        SedicubeError::Generic(error.to_string())
    }
}

/// Result type alias for sedicube operations
pub type Result<T> = std::result::Result<T, SedicubeError>;
