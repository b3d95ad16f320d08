use crate::error::Result;
use async_trait::async_trait;
use labelsched_core::{Binding, NodeInfo, PodInfo};

/// Acknowledgement of an accepted binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAck {
    pub pod_name: String,
    pub node_name: String,
    /// HTTP status the control plane answered with
    pub status: u16,
}

/// Source of pod and node snapshots
///
/// Each call returns a complete, freshly fetched snapshot. Implementations
/// narrow the cluster's resource representation into `PodInfo`/`NodeInfo`.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// List the pods visible to this scheduler
    async fn list_pods(&self) -> Result<Vec<PodInfo>>;

    /// List all cluster nodes
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>>;
}

/// Sink accepting binding decisions
///
/// `bind` performs exactly one submission. Callers must not expect retries.
#[async_trait]
pub trait BindingSink: Send + Sync {
    async fn bind(&self, binding: &Binding) -> Result<BindAck>;
}
