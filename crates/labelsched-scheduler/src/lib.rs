//! Labelsched Scheduler - Label-based pod to node scheduling
//!
//! This crate provides:
//! - Label filter predicates (category, network)
//! - Uniform random node selection
//! - The polling scheduling loop and pod binding

pub mod error;
pub mod filter;
pub mod scheduler;
pub mod select;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SchedulerError};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use types::{FilterResult, MatchPolicy, SkippedPod, TickReport};
