//! Error hierarchy for tcxrs
//!
//! [`DecodeError`] is the failure type of the pure decoding core. It never
//! carries library-internal structure beyond field names, structural paths and
//! the position of the failing node. [`TcxRsError`] wraps it for the file
//! importer, the configuration layer and the CLI.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Position of a failing node inside the document, filled in layer by layer
/// as the error travels up from the point decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeContext {
    /// Index of the activity within `Activities`
    pub activity: Option<usize>,
    /// Index of the lap within its activity
    pub lap: Option<usize>,
    /// Index of the trackpoint within its lap
    pub point: Option<usize>,
}

impl DecodeContext {
    pub fn is_empty(&self) -> bool {
        self.activity.is_none() && self.lap.is_none() && self.point.is_none()
    }
}

impl fmt::Display for DecodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "document");
        }

        let parts: Vec<String> = [
            ("activity", self.activity),
            ("lap", self.lap),
            ("point", self.point),
        ]
        .iter()
        .filter_map(|(name, index)| index.map(|i| format!("{} {}", name, i)))
        .collect();

        write!(f, "{}", parts.join(", "))
    }
}

/// Decode-time failures. Every variant is fatal for the whole parse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Input is not well-formed XML
    #[error("Malformed XML: {reason}")]
    MalformedXml { reason: String },

    /// A required top-level structural node is absent
    #[error("Missing required structure: {path}")]
    MissingStructure { path: String },

    /// A required field is absent or fails type conversion
    #[error("Invalid field {field} at {context}: {reason}")]
    FieldParse {
        field: String,
        context: DecodeContext,
        reason: String,
    },

    /// A lap without any trackpoints
    #[error("Lap has no trackpoints at {context}")]
    EmptyLap { context: DecodeContext },

    /// An activity without any laps
    #[error("Activity has no laps at {context}")]
    EmptyActivity { context: DecodeContext },
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl fmt::Display) -> Self {
        DecodeError::MalformedXml {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn missing_field(field: &str) -> Self {
        DecodeError::FieldParse {
            field: field.to_string(),
            context: DecodeContext::default(),
            reason: "field is missing".to_string(),
        }
    }

    pub(crate) fn invalid_field(field: &str, reason: impl fmt::Display) -> Self {
        DecodeError::FieldParse {
            field: field.to_string(),
            context: DecodeContext::default(),
            reason: reason.to_string(),
        }
    }

    /// The name of the offending field, for `FieldParse` failures
    pub fn field(&self) -> Option<&str> {
        match self {
            DecodeError::FieldParse { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Where in the document the failure happened, if known
    pub fn context(&self) -> Option<&DecodeContext> {
        match self {
            DecodeError::FieldParse { context, .. }
            | DecodeError::EmptyLap { context }
            | DecodeError::EmptyActivity { context } => Some(context),
            _ => None,
        }
    }

    fn with_context(mut self, update: impl FnOnce(&mut DecodeContext)) -> Self {
        match &mut self {
            DecodeError::FieldParse { context, .. }
            | DecodeError::EmptyLap { context }
            | DecodeError::EmptyActivity { context } => update(context),
            DecodeError::MalformedXml { .. } | DecodeError::MissingStructure { .. } => {}
        }
        self
    }

    /// Tag the error with the index of the trackpoint it came from
    pub(crate) fn at_point(self, index: usize) -> Self {
        self.with_context(|c| c.point = Some(index))
    }

    /// Tag the error with the index of the lap it came from
    pub(crate) fn at_lap(self, index: usize) -> Self {
        self.with_context(|c| c.lap = Some(index))
    }

    /// Tag the error with the index of the activity it came from
    pub(crate) fn at_activity(self, index: usize) -> Self {
        self.with_context(|c| c.activity = Some(index))
    }
}

/// Top-level error type for importer, configuration and CLI operations
#[derive(Debug, Error)]
pub enum TcxRsError {
    /// Decoding a file failed
    #[error("Failed to import {path}: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON export errors
    #[error("Export error: {0}")]
    Export(#[from] serde_json::Error),
}

/// Result type alias for tcxrs operations
pub type Result<T> = std::result::Result<T, TcxRsError>;

impl TcxRsError {
    /// Only reading the input can succeed on a second attempt; decoding is
    /// deterministic for a given text.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TcxRsError::Io(_))
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TcxRsError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorSeverity::Warning,
            TcxRsError::Configuration(_) => ErrorSeverity::Warning,
            TcxRsError::Export(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// The underlying decode failure, if any
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            TcxRsError::Import { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            TcxRsError::Import {
                path,
                source: DecodeError::MalformedXml { .. },
            } => format!("{} is not a readable XML file", path.display()),
            TcxRsError::Import {
                path,
                source: DecodeError::MissingStructure { path: structure },
            } => format!(
                "{} does not look like a TCX file (missing {})",
                path.display(),
                structure
            ),
            TcxRsError::Import { path, source } => {
                format!("Could not decode {}: {}", path.display(), source)
            }
            TcxRsError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                "Could not find the activity file.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Failure that leaves the process unable to continue
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
