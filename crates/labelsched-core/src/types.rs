use crate::error::{CoreError, Result};
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Label keys the scheduler reads placement attributes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelKeys {
    /// Key of the category label
    pub category: String,
    /// Key of the network label
    pub network: String,
}

impl Default for LabelKeys {
    fn default() -> Self {
        Self {
            category: "category".to_string(),
            network: "network".to_string(),
        }
    }
}

/// Placement attributes carried by both pods and nodes.
///
/// An empty label and an absent label are the same value and are stored as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Placement {
    pub category: Option<String>,
    pub network: Option<String>,
}

impl Placement {
    /// Build a placement, folding empty strings into `None`
    pub fn new(category: Option<&str>, network: Option<&str>) -> Self {
        Self {
            category: normalize_label(category),
            network: normalize_label(network),
        }
    }
}

/// Fold an empty label value into `None`
pub fn normalize_label(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Narrow view of a pod, holding only what the scheduler decides on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    /// Value of `spec.schedulerName`, empty when the pod does not name one
    pub scheduler_name: String,
    /// Value of `spec.nodeName`, `None` while unscheduled
    pub node_name: Option<String>,
    pub placement: Placement,
}

impl PodInfo {
    /// Whether this pod is waiting for the named scheduler to place it
    pub fn is_pending_for(&self, scheduler_name: &str) -> bool {
        self.scheduler_name == scheduler_name && self.node_name.is_none()
    }
}

/// Narrow view of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    pub placement: Placement,
}

/// A scheduling decision committing one pod to one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub pod_name: String,
    pub namespace: String,
    pub node_name: String,
}

impl Binding {
    pub fn new(pod: &PodInfo, node_name: impl Into<String>) -> Self {
        Self {
            pod_name: pod.name.clone(),
            namespace: pod.namespace.clone(),
            node_name: node_name.into(),
        }
    }

    /// Convert into the `v1/Binding` resource submitted to the control plane
    pub fn to_k8s(&self) -> k8s_openapi::api::core::v1::Binding {
        k8s_openapi::api::core::v1::Binding {
            metadata: ObjectMeta {
                name: Some(self.pod_name.clone()),
                ..Default::default()
            },
            target: ObjectReference {
                api_version: Some("v1".to_string()),
                kind: Some("Node".to_string()),
                name: Some(self.node_name.clone()),
                ..Default::default()
            },
        }
    }

    /// Serialize the `v1/Binding` resource to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_k8s()).map_err(|e| {
            CoreError::serialization_error(
                format!("Failed to serialize binding: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}
