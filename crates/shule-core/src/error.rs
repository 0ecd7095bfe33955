//! Portal error types
//!
//! Error definitions with transient/permanent classification. The remote
//! portal reports almost everything as a 200-OK body, so most variants
//! carry the portal's own wording verbatim; it is often the only
//! diagnostic available.

use thiserror::Error;

/// Error that can occur while driving the remote portal.
#[derive(Debug, Error)]
pub enum PortalError {
    // Transport errors (transient)
    /// Network-level failure: connect, timeout, DNS, reset.
    #[error("transport failure on {path}: {source}")]
    Transport {
        /// The portal path the request was addressed to.
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // Session errors (caller re-authenticates and retries the whole operation)
    /// Login rejected, or the credential-success marker never appeared.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The portal redirected to its session-expired/unauthorized page.
    #[error("session expired")]
    SessionExpired,

    // Protocol errors (fatal for the current operation)
    /// Expected hidden-state or listing markup was absent. Indicates the
    /// remote page shape no longer matches assumptions.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    // Business-rule failures signaled by the remote system
    /// An earlier lifecycle step has not happened on the remote side.
    #[error("prerequisite not met: {message}")]
    Prerequisite { message: String },

    /// The institution has no vacancies left for the requested grade.
    #[error("capacity exhausted: {message}")]
    CapacityExhausted { message: String },

    // Recognized-failure responses (remote wording preserved verbatim)
    /// The placement request form was rejected.
    #[error("request failed: {message}")]
    RequestFailed { message: String },

    /// The biodata capture form was rejected.
    #[error("capture failed: {message}")]
    CaptureFailed { message: String },

    /// The portal responded, but with no recognized success or failure
    /// marker. Never assumed successful.
    #[error("unrecognized response during {context}")]
    UnrecognizedResponse { context: String },

    /// Reconciliation decided the learner plausibly exists elsewhere under
    /// different control; requires explicit transfer-flow resolution.
    #[error("conflict: {reason}")]
    Conflict { reason: String },

    // Configuration errors
    /// Client configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl PortalError {
    /// Check if this error is transient.
    ///
    /// Only transport-level failures qualify; the session layer never
    /// retries them itself, but callers may.
    pub fn is_transient(&self) -> bool {
        matches!(self, PortalError::Transport { .. })
    }

    /// Check if this error is permanent for the current attempt.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Whether the caller should re-authenticate and retry the whole
    /// operation, rather than the single failed request.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            PortalError::SessionExpired | PortalError::Authentication { .. }
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            PortalError::Transport { .. } => "TRANSPORT",
            PortalError::Authentication { .. } => "AUTHENTICATION",
            PortalError::SessionExpired => "SESSION_EXPIRED",
            PortalError::Protocol { .. } => "PROTOCOL",
            PortalError::Prerequisite { .. } => "PREREQUISITE",
            PortalError::CapacityExhausted { .. } => "CAPACITY_EXHAUSTED",
            PortalError::RequestFailed { .. } => "REQUEST_FAILED",
            PortalError::CaptureFailed { .. } => "CAPTURE_FAILED",
            PortalError::UnrecognizedResponse { .. } => "UNRECOGNIZED_RESPONSE",
            PortalError::Conflict { .. } => "CONFLICT",
            PortalError::InvalidConfiguration { .. } => "INVALID_CONFIG",
        }
    }

    // Convenience constructors

    /// Create a transport error for the given path.
    pub fn transport(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        PortalError::Transport {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        PortalError::Authentication {
            message: message.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        PortalError::Protocol {
            message: message.into(),
        }
    }

    /// Create a prerequisite error.
    pub fn prerequisite(message: impl Into<String>) -> Self {
        PortalError::Prerequisite {
            message: message.into(),
        }
    }

    /// Create a request-failed error preserving the remote message.
    pub fn request_failed(message: impl Into<String>) -> Self {
        PortalError::RequestFailed {
            message: message.into(),
        }
    }

    /// Create a capture-failed error preserving the remote message.
    pub fn capture_failed(message: impl Into<String>) -> Self {
        PortalError::CaptureFailed {
            message: message.into(),
        }
    }

    /// Create an unrecognized-response error for the given context.
    pub fn unrecognized(context: impl Into<String>) -> Self {
        PortalError::UnrecognizedResponse {
            context: context.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(reason: impl Into<String>) -> Self {
        PortalError::Conflict {
            reason: reason.into(),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        PortalError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type for portal operations.
pub type PortalResult<T> = Result<T, PortalError>;
