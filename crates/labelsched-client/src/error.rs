use miette::Diagnostic;
use thiserror::Error;

/// Error type for control-plane calls
#[derive(Error, Debug, Diagnostic)]
pub enum ClientError {
    /// The request never produced a response
    #[error("{method} {url} failed: {message}")]
    #[diagnostic(
        code(labelsched::client::request_failed),
        help("Check that the control-plane endpoint is reachable, e.g. that `kubectl proxy` is running")
    )]
    RequestFailed {
        #[allow(unused)]
        method: String,
        #[allow(unused)]
        url: String,
        #[allow(unused)]
        message: String,
    },

    /// The request exceeded the client timeout
    #[error("{method} {url} timed out")]
    #[diagnostic(
        code(labelsched::client::timeout),
        help("The control plane is slow or unreachable. Raise --request-timeout-ms if it persists")
    )]
    Timeout {
        #[allow(unused)]
        method: String,
        #[allow(unused)]
        url: String,
    },

    /// The control plane answered with a non-success status
    #[error("{method} {url} returned status {status}: {body}")]
    #[diagnostic(
        code(labelsched::client::unexpected_status),
        help("The control plane rejected the request. A 409 on a binding usually means the pod is already bound")
    )]
    UnexpectedStatus {
        #[allow(unused)]
        method: String,
        #[allow(unused)]
        url: String,
        #[allow(unused)]
        status: u16,
        #[allow(unused)]
        body: String,
    },

    /// Response body could not be decoded
    #[error("Failed to decode {what}: {message}")]
    #[diagnostic(
        code(labelsched::client::decode_failed),
        help("Verify the endpoint serves the Kubernetes core/v1 API")
    )]
    DecodeFailed {
        #[allow(unused)]
        what: String,
        #[allow(unused)]
        message: String,
    },

    /// Invalid client configuration
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(labelsched::client::invalid_config), help("{suggestion}"))]
    InvalidConfig {
        #[allow(unused)]
        message: String,
        #[allow(unused)]
        suggestion: String,
    },

    /// Core library error
    #[error(transparent)]
    #[diagnostic(transparent)]
    CoreError(#[from] labelsched_core::CoreError),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub fn request_failed(
        method: impl Into<String>,
        url: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::RequestFailed {
            method: method.into(),
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn timeout(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Timeout {
            method: method.into(),
            url: url.into(),
        }
    }

    pub fn unexpected_status(
        method: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::UnexpectedStatus {
            method: method.into(),
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub fn decode_failed(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DecodeFailed {
            what: what.into(),
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Map a reqwest transport error onto the client taxonomy
    pub fn from_reqwest(method: &str, url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(method, url)
        } else {
            Self::request_failed(method, url, err.to_string())
        }
    }
}
