// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

pub mod api_client;
pub mod error;
pub mod mock;
pub mod traits;

// Re-export primary types
pub use api_client::{ApiClient, ApiClientConfig};
pub use error::{ClientError, Result};
pub use mock::MockCluster;
pub use traits::{BindAck, BindingSink, SnapshotSource};
