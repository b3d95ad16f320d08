// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use labelsched_client::ClientError;
use miette::Diagnostic;
use thiserror::Error;

/// Scheduler error type
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    /// A pod or node snapshot could not be retrieved
    #[error("Failed to fetch {resource}: {source}")]
    #[diagnostic(
        code(scheduler::fetch_failed),
        help("The remaining work of this tick is skipped. The next tick fetches a fresh snapshot")
    )]
    FetchFailed {
        resource: String,
        #[source]
        source: ClientError,
    },

    /// No node satisfies the pod's placement labels
    #[error("No eligible node for pod {pod_name}: {reason}")]
    #[diagnostic(
        code(scheduler::no_eligible_node),
        help("Label a node with the pod's category and network values, or fix the pod's labels")
    )]
    NoEligibleNode { pod_name: String, reason: String },

    /// The control plane did not accept the binding
    #[error("Failed to bind pod {pod_name} to node {node_name}: {source}")]
    #[diagnostic(
        code(scheduler::bind_failed),
        help("The pod stays pending and is retried on a later tick if still unassigned")
    )]
    BindFailed {
        pod_name: String,
        node_name: String,
        #[source]
        source: ClientError,
    },

    /// Invalid scheduler configuration
    #[error("Invalid scheduler configuration: {message}")]
    #[diagnostic(code(scheduler::invalid_config), help("{suggestion}"))]
    InvalidConfig { message: String, suggestion: String },
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Create a FetchFailed error
    pub fn fetch_failed(resource: impl Into<String>, source: ClientError) -> Self {
        Self::FetchFailed {
            resource: resource.into(),
            source,
        }
    }

    /// Create a NoEligibleNode error
    pub fn no_eligible_node(pod_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NoEligibleNode {
            pod_name: pod_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a BindFailed error
    pub fn bind_failed(
        pod_name: impl Into<String>,
        node_name: impl Into<String>,
        source: ClientError,
    ) -> Self {
        Self::BindFailed {
            pod_name: pod_name.into(),
            node_name: node_name.into(),
            source,
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Short label used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchFailed { .. } => "fetch",
            Self::NoEligibleNode { .. } => "no_eligible_node",
            Self::BindFailed { .. } => "bind",
            Self::InvalidConfig { .. } => "invalid_config",
        }
    }
}
