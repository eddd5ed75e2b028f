use std::error::Error;
use std::fmt::Display;
use std::time::Duration;

/// Crate-wide result type for classification and encoding operations.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Failures raised while classifying inbound fragments or encoding outbound messages.
///
/// Every variant is meant to be caught at the smallest enclosing unit (one fragment, one encode
/// call) and handed to an [`ErrorSink`](crate::ErrorSink).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A fragment is missing a required field or carries a value of the wrong shape.
    #[error("malformed fragment: {message}")]
    MalformedFragment { message: String },

    /// The platform reported a type tag with no message variant.
    #[error("message type {tag} not supported")]
    UnsupportedType { tag: String },

    /// A constructed record violates a field invariant.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Account or sender lookup-or-create failed.
    #[error("resolution failed: {message}")]
    Resolution { message: String },

    /// An outbound builder received a constraint violation.
    #[error("encode failed: {message}")]
    Encode { message: String },

    /// The transport collaborator reported a failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl ModelError {
    #[must_use]
    pub fn malformed(message: impl Display) -> Self {
        Self::MalformedFragment {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unsupported(tag: impl Display) -> Self {
        Self::UnsupportedType {
            tag: tag.to_string(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Display) -> Self {
        Self::Validation {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn resolution(message: impl Display) -> Self {
        Self::Resolution {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn encode(message: impl Display) -> Self {
        Self::Encode {
            message: message.to_string(),
        }
    }

    /// Short machine-readable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedFragment { .. } => "malformed_fragment",
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::Validation { .. } => "validation",
            Self::Resolution { .. } => "resolution",
            Self::Encode { .. } => "encode",
            Self::Transport(_) => "transport",
            Self::SerdeJson(_) => "serde_json",
        }
    }
}

/// Boxed cause attached to a [`TransportError`].
pub type TransportCause = Box<dyn Error + Send + Sync + 'static>;

/// Failure reported by a [`Transport`](crate::Transport) for one envelope.
///
/// `code` is a stable machine-readable tag such as `whatsapp_send_failed`. A transient failure
/// may carry the platform's `retry-after` hint; nothing in this workspace acts on it.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct TransportError {
    code: String,
    message: String,
    transient: bool,
    retry_after: Option<Duration>,
    #[source]
    cause: Option<TransportCause>,
}

impl TransportError {
    /// The platform rejected the envelope; sending it again will fail the same way.
    pub fn permanent(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            transient: false,
            retry_after: None,
            cause: None,
        }
    }

    /// Throttling, server errors, or a dropped connection.
    pub fn transient(
        code: impl Into<String>,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            transient: true,
            retry_after,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<TransportCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_type_message_names_the_tag() {
        let err = ModelError::unsupported("location");
        assert_eq!(err.to_string(), "message type location not supported");
        assert_eq!(err.kind(), "unsupported_type");
    }

    #[test]
    fn transport_error_converts_and_keeps_code() {
        let err: ModelError =
            TransportError::transient("whatsapp_http", "connection reset", None)
                .with_cause(std::io::Error::other("reset by peer"))
                .into();
        assert_eq!(err.to_string(), "whatsapp_http: connection reset");
        match err {
            ModelError::Transport(inner) => {
                assert!(inner.is_transient());
                assert_eq!(inner.retry_after(), None);
                assert_eq!(inner.source().map(|e| e.to_string()).as_deref(), Some("reset by peer"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
