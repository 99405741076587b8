//! Error types for the logging pipeline

pub type Result<T> = std::result::Result<T, LogError>;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Level lookup failed for every accepted key form
    #[error("Unknown level: '{key}'")]
    NotFound { key: String },

    /// Comparison against an operand the level model does not order
    #[error("'{op}' not supported between '{lhs}' and '{rhs}'")]
    TypeMismatch {
        op: String,
        lhs: String,
        rhs: String,
    },

    /// Exception chain is structurally inconsistent
    #[error("Malformed traceback: {reason}")]
    MalformedTrace { reason: String },

    /// A sink failed to deliver rendered output
    #[error("Sink '{sink}' failed to deliver: {message}")]
    SinkDeliveryFailure { sink: String, message: String },

    /// Source file could not be read while rendering a frame
    #[error("Source unavailable for '{path}': {message}")]
    SourceUnavailable { path: String, message: String },

    /// Message template could not be formatted with the record arguments
    #[error("Format error in '{template}': {message}")]
    Format { template: String, message: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (configuration) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LogError {
    /// Create a level lookup failure
    pub fn not_found(key: impl Into<String>) -> Self {
        LogError::NotFound { key: key.into() }
    }

    /// Create an invalid comparison error
    pub fn type_mismatch(
        op: impl Into<String>,
        lhs: impl Into<String>,
        rhs: impl Into<String>,
    ) -> Self {
        LogError::TypeMismatch {
            op: op.into(),
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    /// Create a malformed traceback error
    pub fn malformed_trace(reason: impl Into<String>) -> Self {
        LogError::MalformedTrace {
            reason: reason.into(),
        }
    }

    /// Create a sink delivery failure
    pub fn sink_delivery(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::SinkDeliveryFailure {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a source unavailable error
    pub fn source_unavailable(path: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::SourceUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a message format error
    pub fn format(template: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::Format {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LogError::Other(msg.into())
    }

    /// Whether this error belongs to delivery rather than record construction
    pub fn is_delivery(&self) -> bool {
        matches!(self, LogError::SinkDeliveryFailure { .. } | LogError::Io(_))
    }
}
