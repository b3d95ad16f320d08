//! Labelsched Core - Snapshot types shared by the labelsched crates
//!
//! This crate provides:
//! - Narrow pod/node snapshot value objects
//! - The adapter that narrows k8s-openapi resources into snapshots
//! - The binding intent record and its wire representation
//! - Error types with miette diagnostics

pub mod adapter;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use adapter::{narrow_node, narrow_pod};
pub use error::{CoreError, Result};
pub use types::{Binding, LabelKeys, NodeInfo, Placement, PodInfo};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::core::v1::{Node, Pod};
