use thiserror::Error;

/// Main error type for the clipforge library
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Edit failed: {0}")]
    Edit(#[from] EditError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Failures of a single edit request
///
/// Every variant is terminal for the request that raised it. The editor facade
/// turns these into a status message with no output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Invalid {operation} range: {start}s to {end}s (duration {duration:.2}s)")]
    InvalidRange {
        operation: String,
        start: f64,
        end: f64,
        duration: f64,
    },

    #[error("Invalid {operation} parameter: {reason}")]
    InvalidParameter { operation: String, reason: String },

    #[error("Missing input: {what}")]
    MissingInput { what: String },

    #[error("Unknown option: {option}")]
    UnknownOption { option: String },

    #[error("Unable to read media '{path}': {reason}")]
    MediaUnreadable { path: String, reason: String },

    #[error("Unable to write media '{path}': {reason}")]
    EncodeFault { path: String, reason: String },

    #[error("No image provided")]
    NoImage,

    #[error("Unable to decode image '{path}'")]
    UndecodableImage { path: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using EditorError
pub type Result<T> = std::result::Result<T, EditorError>;

impl EditError {
    pub fn invalid_parameter<O: Into<String>, R: Into<String>>(operation: O, reason: R) -> Self {
        Self::InvalidParameter {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn missing<S: Into<String>>(what: S) -> Self {
        Self::MissingInput { what: what.into() }
    }

    pub fn unreadable<P: std::fmt::Display, R: Into<String>>(path: P, reason: R) -> Self {
        Self::MediaUnreadable {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn encode_fault<P: std::fmt::Display, R: Into<String>>(path: P, reason: R) -> Self {
        Self::EncodeFault {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

impl EditorError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// The underlying edit failure, if this is one
    pub fn as_edit(&self) -> Option<&EditError> {
        match self {
            Self::Edit(e) => Some(e),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Edit(EditError::InvalidRange { duration, .. }) => {
                format!(
                    "Error: Invalid range. Start must be less than end and within the video duration ({:.2} seconds).",
                    duration
                )
            }
            Self::Edit(EditError::MissingInput { what }) => {
                format!("Error: Please provide {}.", what)
            }
            Self::Edit(EditError::UnknownOption { option }) => {
                format!("Error: Invalid selection '{}'.", option)
            }
            Self::Edit(EditError::NoImage) => "Error: No image uploaded".to_string(),
            Self::Edit(EditError::UndecodableImage { .. }) => {
                "Error: Unable to read image. Ensure it's a valid image file.".to_string()
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => format!("Error: {}", self),
        }
    }
}
