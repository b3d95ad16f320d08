use crate::error::{ClientError, Result};
use crate::traits::{BindAck, BindingSink, SnapshotSource};
use async_trait::async_trait;
use labelsched_core::{Binding, NodeInfo, PodInfo};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct MockState {
    pods: Vec<PodInfo>,
    nodes: Vec<NodeInfo>,
    bindings: Vec<Binding>,
    bind_attempts: Vec<Binding>,
    rejected_pods: HashSet<String>,
    fail_pod_list: bool,
    fail_node_list: bool,
    node_list_calls: usize,
}

/// In-memory cluster for testing the scheduler without a control plane
///
/// Serves pod/node snapshots from memory and records every binding attempt.
/// An accepted binding assigns the pod, and a second binding for an already
/// assigned pod is rejected with 409 the way the API server does.
#[derive(Clone, Default)]
pub struct MockCluster {
    state: Arc<RwLock<MockState>>,
}

impl MockCluster {
    pub fn new(pods: Vec<PodInfo>, nodes: Vec<NodeInfo>) -> Self {
        Self {
            state: Arc::new(RwLock::new(MockState {
                pods,
                nodes,
                ..Default::default()
            })),
        }
    }

    /// Reject every binding for the named pod
    pub async fn reject_bindings_for(&self, pod_name: &str) {
        self.state
            .write()
            .await
            .rejected_pods
            .insert(pod_name.to_string());
    }

    /// Make pod and/or node listing fail
    pub async fn fail_listing(&self, pods: bool, nodes: bool) {
        let mut state = self.state.write().await;
        state.fail_pod_list = pods;
        state.fail_node_list = nodes;
    }

    pub async fn set_nodes(&self, nodes: Vec<NodeInfo>) {
        self.state.write().await.nodes = nodes;
    }

    /// Accepted bindings, in submission order
    pub async fn bindings(&self) -> Vec<Binding> {
        self.state.read().await.bindings.clone()
    }

    /// Every binding submission, accepted or not
    pub async fn bind_attempts(&self) -> Vec<Binding> {
        self.state.read().await.bind_attempts.clone()
    }

    pub async fn node_list_calls(&self) -> usize {
        self.state.read().await.node_list_calls
    }

    pub async fn pod(&self, name: &str) -> Option<PodInfo> {
        self.state
            .read()
            .await
            .pods
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }
}

#[async_trait]
impl SnapshotSource for MockCluster {
    async fn list_pods(&self) -> Result<Vec<PodInfo>> {
        let state = self.state.read().await;
        if state.fail_pod_list {
            return Err(ClientError::request_failed(
                "GET",
                "mock://pods",
                "connection refused",
            ));
        }
        Ok(state.pods.clone())
    }

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        let mut state = self.state.write().await;
        state.node_list_calls += 1;
        if state.fail_node_list {
            return Err(ClientError::request_failed(
                "GET",
                "mock://nodes",
                "connection refused",
            ));
        }
        Ok(state.nodes.clone())
    }
}

#[async_trait]
impl BindingSink for MockCluster {
    async fn bind(&self, binding: &Binding) -> Result<BindAck> {
        let mut state = self.state.write().await;
        state.bind_attempts.push(binding.clone());

        let url = format!("mock://pods/{}/binding", binding.pod_name);
        if state.rejected_pods.contains(&binding.pod_name) {
            return Err(ClientError::unexpected_status(
                "POST",
                url,
                500,
                "binding rejected",
            ));
        }

        let pod = state
            .pods
            .iter_mut()
            .find(|p| p.name == binding.pod_name && p.namespace == binding.namespace)
            .ok_or_else(|| {
                ClientError::unexpected_status("POST", url.clone(), 404, "pod not found")
            })?;

        if pod.node_name.is_some() {
            return Err(ClientError::unexpected_status(
                "POST",
                url,
                409,
                "pod is already assigned to a node",
            ));
        }

        pod.node_name = Some(binding.node_name.clone());
        state.bindings.push(binding.clone());
        debug!(
            "Mock: pod {} bound to node {}",
            binding.pod_name, binding.node_name
        );

        Ok(BindAck {
            pod_name: binding.pod_name.clone(),
            node_name: binding.node_name.clone(),
            status: 201,
        })
    }
}
