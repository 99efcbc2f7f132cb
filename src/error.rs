//! Error types
//!
//! Every failure in this crate is a returned [`CloudError`]. Transport-level
//! failures arrive as [`TransportError`] and are classified on conversion.

use thiserror::Error;

/// Failure reported by a [`Transport`](crate::client::Transport)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("API request failed: {code} - {message}")]
    Status { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response JSON: {0}")]
    Decode(String),
}

/// Coarse classification of a [`CloudError`], independent of context layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NotSupported,
    Transient,
    OperationFailed,
    Timeout,
    Api,
    Decode,
}

/// Adapter errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("{operation} is not supported for {kind}")]
    NotSupported { kind: String, operation: String },

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Operation {id} failed: {reason}")]
    OperationFailed { id: String, reason: String },

    #[error("Timed out after {waited_secs}s waiting for {what}")]
    Timeout {
        what: String,
        waited_secs: u64,
        last_error: Option<String>,
    },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<CloudError>,
    },
}

pub type Result<T> = std::result::Result<T, CloudError>;

impl CloudError {
    pub fn not_found(kind: &str, id: &str) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    pub fn not_supported(kind: &str, operation: &str) -> Self {
        Self::NotSupported {
            kind: kind.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Classification of the innermost error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::Transient(_) => ErrorKind::Transient,
            Self::OperationFailed { .. } => ErrorKind::OperationFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Api { .. } => ErrorKind::Api,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Context { source, .. } => source.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Wrap this error with a context string
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<TransportError> for CloudError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { code: 404, message } => Self::NotFound {
                kind: "resource".to_string(),
                id: message,
            },
            TransportError::Status { code, message } if code == 429 || code >= 500 => {
                Self::Transient(format!("{}: {}", code, message))
            },
            TransportError::Status { code, message } => Self::Api {
                status: code,
                message,
            },
            TransportError::Network(msg) | TransportError::Decode(msg) => Self::Transient(msg),
        }
    }
}

/// Attach `kind/id/operation` context to a failing result
pub trait ResultExt<T> {
    fn with_context(self, kind: &str, id: &str, operation: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, kind: &str, id: &str, operation: &str) -> Result<T> {
        self.map_err(|e| {
            let context = if id.is_empty() {
                format!("{} {}", operation, kind)
            } else {
                format!("{} {} {}", operation, kind, id)
            };
            e.context(context)
        })
    }
}

/// Format an error for display in the CLI
pub fn format_cloud_error(error: &CloudError) -> String {
    match error.kind() {
        ErrorKind::NotFound => "Resource not found.".to_string(),
        ErrorKind::NotSupported => error.to_string(),
        ErrorKind::Timeout => format!("{}. The operation may still complete later.", error),
        ErrorKind::OperationFailed => error.to_string(),
        ErrorKind::Transient => {
            "Cloud service temporarily unavailable. Please try again.".to_string()
        },
        ErrorKind::Api | ErrorKind::Decode => {
            let text = error.to_string();
            if text.contains("401") {
                return "Authentication failed. Check the configured token.".to_string();
            }
            if text.contains("403") {
                return "Permission denied. Check your account permissions.".to_string();
            }
            if text.contains("409") {
                return "Resource conflict. The resource may already exist or be in use."
                    .to_string();
            }
            // Truncate long error messages
            let sanitized = text
                .chars()
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .take(120)
                .collect::<String>();
            if sanitized.len() < text.len() {
                format!("{}...", sanitized)
            } else {
                sanitized
            }
        },
    }
}
