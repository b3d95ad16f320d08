use crate::types::{FilterResult, MatchPolicy};
use labelsched_core::{NodeInfo, Placement};
use tracing::debug;

/// Filter predicate trait
pub trait FilterPredicate: Send + Sync {
    /// Filter a node for a pod with the given placement
    fn filter(&self, placement: &Placement, node: &NodeInfo) -> FilterResult;

    /// Name of the filter
    fn name(&self) -> &str;
}

/// Placement label a predicate compares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAxis {
    Category,
    Network,
}

impl LabelAxis {
    fn value(self, placement: &Placement) -> Option<&str> {
        match self {
            LabelAxis::Category => placement.category.as_deref(),
            LabelAxis::Network => placement.network.as_deref(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            LabelAxis::Category => "category",
            LabelAxis::Network => "network",
        }
    }
}

/// Filter requiring a node's label to equal the pod's on one axis
pub struct LabelMatch {
    axis: LabelAxis,
    policy: MatchPolicy,
}

impl LabelMatch {
    pub fn new(axis: LabelAxis, policy: MatchPolicy) -> Self {
        Self { axis, policy }
    }
}

impl FilterPredicate for LabelMatch {
    fn filter(&self, placement: &Placement, node: &NodeInfo) -> FilterResult {
        let wanted = self.axis.value(placement);
        let actual = self.axis.value(&node.placement);

        let matched = match (self.policy, wanted) {
            (MatchPolicy::AbsentMatchesAny, None) => true,
            _ => wanted == actual,
        };

        if matched {
            FilterResult::pass(node.name.clone())
        } else {
            FilterResult::fail(
                node.name.clone(),
                format!(
                    "{} mismatch: pod wants {}, node has {}",
                    self.axis.as_str(),
                    wanted.unwrap_or("<unset>"),
                    actual.unwrap_or("<unset>")
                ),
            )
        }
    }

    fn name(&self) -> &str {
        match self.axis {
            LabelAxis::Category => "CategoryMatch",
            LabelAxis::Network => "NetworkMatch",
        }
    }
}

/// Get default filter predicates
pub fn default_filters(policy: MatchPolicy) -> Vec<Box<dyn FilterPredicate>> {
    vec![
        Box::new(LabelMatch::new(LabelAxis::Category, policy)),
        Box::new(LabelMatch::new(LabelAxis::Network, policy)),
    ]
}

/// Names of the nodes passing every filter, in snapshot order
pub fn eligible_nodes(
    filters: &[Box<dyn FilterPredicate>],
    placement: &Placement,
    nodes: &[NodeInfo],
) -> Vec<String> {
    nodes
        .iter()
        .filter(|node| {
            filters.iter().all(|filter| {
                let result = filter.filter(placement, node);
                if !result.passed {
                    debug!(
                        "Node {} filtered out by {}: {}",
                        node.name,
                        filter.name(),
                        result.reason.unwrap_or_default()
                    );
                }
                result.passed
            })
        })
        .map(|node| node.name.clone())
        .collect()
}
