use labelsched_core::Binding;
use std::fmt;
use std::str::FromStr;

/// Result of filtering a node
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Node name
    pub node_name: String,
    /// Whether the node passed the filter
    pub passed: bool,
    /// Reason for failure (if any)
    pub reason: Option<String>,
}

impl FilterResult {
    /// Create a passing filter result
    pub fn pass(node_name: String) -> Self {
        Self {
            node_name,
            passed: true,
            reason: None,
        }
    }

    /// Create a failing filter result
    pub fn fail(node_name: String, reason: String) -> Self {
        Self {
            node_name,
            passed: false,
            reason: Some(reason),
        }
    }
}

/// How a placement label the pod leaves unset is matched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Unset only matches unset: a pod without a category lands on nodes without one
    #[default]
    Exact,
    /// An unset pod label accepts any node value on that axis
    AbsentMatchesAny,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPolicy::Exact => "exact",
            MatchPolicy::AbsentMatchesAny => "absent-matches-any",
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(MatchPolicy::Exact),
            "absent-matches-any" => Ok(MatchPolicy::AbsentMatchesAny),
            other => Err(format!(
                "unknown match policy '{}', expected 'exact' or 'absent-matches-any'",
                other
            )),
        }
    }
}

/// A pod left unscheduled by a tick
#[derive(Debug, Clone)]
pub struct SkippedPod {
    pub pod_name: String,
    /// Error kind, see `SchedulerError::kind`
    pub kind: &'static str,
    pub reason: String,
}

/// Outcome of one scheduling tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Pods waiting for this scheduler at fetch time
    pub considered: usize,
    /// Bindings accepted by the control plane
    pub bound: Vec<Binding>,
    pub skipped: Vec<SkippedPod>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.considered == 0
    }
}
