//! Narrowing of full cluster resources into scheduler snapshots

use crate::error::{CoreError, Result};
use crate::types::{normalize_label, LabelKeys, NodeInfo, Placement, PodInfo};
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Namespace assumed for pods whose metadata omits it
pub const DEFAULT_NAMESPACE: &str = "default";

fn placement_from_meta(meta: &ObjectMeta, keys: &LabelKeys) -> Placement {
    let labels = meta.labels.as_ref();
    Placement {
        category: normalize_label(
            labels
                .and_then(|l| l.get(&keys.category))
                .map(String::as_str),
        ),
        network: normalize_label(
            labels
                .and_then(|l| l.get(&keys.network))
                .map(String::as_str),
        ),
    }
}

/// Narrow a k8s-openapi `Pod` into a `PodInfo`
pub fn narrow_pod(pod: &Pod, keys: &LabelKeys) -> Result<PodInfo> {
    let name = pod
        .metadata
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| CoreError::missing_field("Pod", "metadata.name"))?;

    let namespace = pod
        .metadata
        .namespace
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    let spec = pod.spec.as_ref();
    let scheduler_name = spec
        .and_then(|s| s.scheduler_name.clone())
        .unwrap_or_default();
    let node_name = spec
        .and_then(|s| s.node_name.as_deref())
        .and_then(|n| normalize_label(Some(n)));

    Ok(PodInfo {
        name,
        namespace,
        scheduler_name,
        node_name,
        placement: placement_from_meta(&pod.metadata, keys),
    })
}

/// Narrow a k8s-openapi `Node` into a `NodeInfo`
pub fn narrow_node(node: &Node, keys: &LabelKeys) -> Result<NodeInfo> {
    let name = node
        .metadata
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| CoreError::missing_field("Node", "metadata.name"))?;

    Ok(NodeInfo {
        name,
        placement: placement_from_meta(&node.metadata, keys),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::PodSpec;
    use std::collections::BTreeMap;

    fn labels(pairs: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_narrow_pod() {
        let mut pod = Pod::default();
        pod.metadata.name = Some("web-1".to_string());
        pod.metadata.namespace = Some("apps".to_string());
        pod.metadata.labels = labels(&[("category", "db"), ("network", ""), ("app", "web")]);
        pod.spec = Some(PodSpec {
            scheduler_name: Some("my-scheduler".to_string()),
            ..Default::default()
        });

        let info = narrow_pod(&pod, &LabelKeys::default()).unwrap();
        assert_eq!(info.name, "web-1");
        assert_eq!(info.namespace, "apps");
        assert_eq!(info.scheduler_name, "my-scheduler");
        assert_eq!(info.node_name, None);
        assert_eq!(info.placement, Placement::new(Some("db"), None));
    }

    #[test]
    fn test_narrow_pod_defaults() {
        let mut pod = Pod::default();
        pod.metadata.name = Some("bare".to_string());
        pod.spec = Some(PodSpec {
            node_name: Some(String::new()),
            ..Default::default()
        });

        let info = narrow_pod(&pod, &LabelKeys::default()).unwrap();
        assert_eq!(info.namespace, DEFAULT_NAMESPACE);
        assert_eq!(info.scheduler_name, "");
        assert_eq!(info.node_name, None);
        assert_eq!(info.placement, Placement::default());
    }

    #[test]
    fn test_narrow_pod_assigned() {
        let mut pod = Pod::default();
        pod.metadata.name = Some("placed".to_string());
        pod.spec = Some(PodSpec {
            node_name: Some("n1".to_string()),
            ..Default::default()
        });

        let info = narrow_pod(&pod, &LabelKeys::default()).unwrap();
        assert_eq!(info.node_name.as_deref(), Some("n1"));
    }

    #[test]
    fn test_narrow_pod_without_name() {
        let err = narrow_pod(&Pod::default(), &LabelKeys::default()).unwrap_err();
        assert!(matches!(err, CoreError::MissingField { .. }));
    }

    #[test]
    fn test_narrow_node_custom_keys() {
        let mut node = Node::default();
        node.metadata.name = Some("n1".to_string());
        node.metadata.labels = labels(&[
            ("tier", "db"),
            ("category", "web"),
            ("zone-net", "public"),
        ]);

        let keys = LabelKeys {
            category: "tier".to_string(),
            network: "zone-net".to_string(),
        };
        let info = narrow_node(&node, &keys).unwrap();
        assert_eq!(info.name, "n1");
        assert_eq!(info.placement, Placement::new(Some("db"), Some("public")));
    }

    #[test]
    fn test_narrow_node_without_name() {
        let mut node = Node::default();
        node.metadata.name = Some(String::new());
        assert!(narrow_node(&node, &LabelKeys::default()).is_err());
    }
}
