use std::fmt;

/// Result type for emcom operations
pub type Result<T> = std::result::Result<T, EmcomError>;

/// Main error type for the emcom library
#[derive(Debug, Clone, PartialEq)]
pub enum EmcomError {
    /// A required resource is empty, missing or misconfigured
    Configuration {
        resource: String,
        reason: String,
    },

    /// Invalid dimensions for operations
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Failure raised inside an agent or loss forward computation
    Computation(String),

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),
}

impl fmt::Display for EmcomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmcomError::Configuration { resource, reason } => {
                write!(f, "Configuration error in '{}': {}", resource, reason)
            }
            EmcomError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            EmcomError::Computation(msg) => write!(f, "Computation error: {}", msg),
            EmcomError::IoError(msg) => write!(f, "IO error: {}", msg),
            EmcomError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for EmcomError {}

impl From<std::io::Error> for EmcomError {
    fn from(err: std::io::Error) -> Self {
        EmcomError::IoError(err.to_string())
    }
}

impl From<bincode::Error> for EmcomError {
    fn from(err: bincode::Error) -> Self {
        EmcomError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for EmcomError {
    fn from(err: serde_json::Error) -> Self {
        EmcomError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for EmcomError {
    fn from(err: toml::de::Error) -> Self {
        EmcomError::SerializationError(err.to_string())
    }
}

impl From<toml::ser::Error> for EmcomError {
    fn from(err: toml::ser::Error) -> Self {
        EmcomError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl EmcomError {
    pub fn configuration<S: Into<String>, R: Into<String>>(resource: S, reason: R) -> Self {
        EmcomError::Configuration {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        EmcomError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// True for errors that describe a bad setup rather than a failed computation
    pub fn is_configuration(&self) -> bool {
        matches!(self, EmcomError::Configuration { .. })
    }
}
