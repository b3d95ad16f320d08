use crate::filter::{default_filters, eligible_nodes, FilterPredicate};
use crate::select::select_node;
use crate::types::{MatchPolicy, SkippedPod, TickReport};
use crate::{Result, SchedulerError};
use labelsched_client::{BindAck, BindingSink, ClientError, SnapshotSource};
use labelsched_core::{Binding, NodeInfo, PodInfo};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Configuration for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// `spec.schedulerName` this instance claims
    pub scheduler_name: String,
    /// Delay between the end of one cycle and the start of the next
    pub schedule_interval: Duration,
    /// Upper bound for each fetch or bind call
    pub call_timeout: Duration,
    pub match_policy: MatchPolicy,
    /// Fetch a fresh node snapshot for every pod instead of once per cycle
    pub refresh_nodes_per_pod: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scheduler_name: "my-scheduler".to_string(),
            schedule_interval: Duration::from_secs(1),
            call_timeout: Duration::from_secs(15),
            match_policy: MatchPolicy::Exact,
            refresh_nodes_per_pod: true,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scheduler_name.is_empty() {
            return Err(SchedulerError::invalid_config(
                "scheduler name must not be empty",
                "Pass the value pods put in spec.schedulerName, e.g. --scheduler-name my-scheduler",
            ));
        }
        if self.schedule_interval.is_zero() {
            return Err(SchedulerError::invalid_config(
                "schedule interval must be greater than zero",
                "Use e.g. --interval-ms 1000",
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(SchedulerError::invalid_config(
                "call timeout must be greater than zero",
                "Use a timeout of at least a few seconds",
            ));
        }
        Ok(())
    }
}

/// Label-based pod scheduler
pub struct Scheduler {
    source: Arc<dyn SnapshotSource>,
    sink: Arc<dyn BindingSink>,
    config: SchedulerConfig,
    filters: Vec<Box<dyn FilterPredicate>>,
    rng: Mutex<StdRng>,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        sink: Arc<dyn BindingSink>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            source,
            sink,
            filters: default_filters(config.match_policy),
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the random source with a seeded one
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Run the scheduler loop until the token is cancelled
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        info!(
            scheduler_name = %self.config.scheduler_name,
            interval = ?self.config.schedule_interval,
            match_policy = %self.config.match_policy,
            "Starting scheduler"
        );

        loop {
            if token.is_cancelled() {
                break;
            }

            match self.schedule_cycle().await {
                Ok(report) => log_report(&report),
                Err(e) => error!(kind = e.kind(), "Scheduling cycle failed: {}", e),
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(self.config.schedule_interval) => {}
            }
        }

        info!("Scheduler shutting down");
        Ok(())
    }

    /// Run a single scheduling cycle
    pub async fn schedule_cycle(&self) -> Result<TickReport> {
        debug!("Running scheduling cycle");

        let pods = self
            .bounded("GET", "pods", self.source.list_pods())
            .await
            .map_err(|e| SchedulerError::fetch_failed("pods", e))?;

        let pending = self.pending_pods(&pods);
        let mut report = TickReport {
            considered: pending.len(),
            ..Default::default()
        };

        if pending.is_empty() {
            debug!("No unscheduled pods found");
            return Ok(report);
        }

        info!("Found {} unscheduled pods", pending.len());

        let cycle_nodes = if self.config.refresh_nodes_per_pod {
            None
        } else {
            Some(self.fetch_nodes().await?)
        };

        for pod in pending {
            let fresh;
            let nodes: &[NodeInfo] = match &cycle_nodes {
                Some(nodes) => nodes,
                None => {
                    fresh = self.fetch_nodes().await?;
                    &fresh
                }
            };

            match self.schedule_pod(pod, nodes).await {
                Ok(ack) => {
                    info!(
                        pod = %ack.pod_name,
                        node = %ack.node_name,
                        status = ack.status,
                        "Scheduled pod {} to node {}",
                        ack.pod_name,
                        ack.node_name
                    );
                    report.bound.push(Binding::new(pod, ack.node_name));
                }
                Err(e) => {
                    warn!(
                        pod = %pod.name,
                        namespace = %pod.namespace,
                        kind = e.kind(),
                        "Skipping pod {}: {}",
                        pod.name,
                        e
                    );
                    report.skipped.push(SkippedPod {
                        pod_name: pod.name.clone(),
                        kind: e.kind(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Pods that name this scheduler and have no node, each at most once
    fn pending_pods<'a>(&self, pods: &'a [PodInfo]) -> Vec<&'a PodInfo> {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for pod in pods {
            if pod.is_pending_for(&self.config.scheduler_name)
                && seen.insert((pod.namespace.as_str(), pod.name.as_str()))
            {
                pending.push(pod);
            }
        }
        pending
    }

    async fn fetch_nodes(&self) -> Result<Vec<NodeInfo>> {
        let nodes = self
            .bounded("GET", "nodes", self.source.list_nodes())
            .await
            .map_err(|e| SchedulerError::fetch_failed("nodes", e))?;

        if nodes.is_empty() {
            warn!("No nodes available for scheduling");
        }

        Ok(nodes)
    }

    /// Filter, select and bind a single pod
    async fn schedule_pod(&self, pod: &PodInfo, nodes: &[NodeInfo]) -> Result<BindAck> {
        let eligible = eligible_nodes(&self.filters, &pod.placement, nodes);
        debug!(
            "Pod {} has {} eligible nodes out of {}",
            pod.name,
            eligible.len(),
            nodes.len()
        );

        let node_name = {
            let mut rng = self.rng.lock().await;
            select_node(&pod.name, &eligible, &mut *rng)?
        };

        let binding = Binding::new(pod, node_name);
        info!(
            "Binding pod {} to node {}",
            binding.pod_name, binding.node_name
        );

        let target = format!("pods/{}/binding", binding.pod_name);
        self.bounded("POST", &target, self.sink.bind(&binding))
            .await
            .map_err(|e| SchedulerError::bind_failed(&binding.pod_name, &binding.node_name, e))
    }

    /// Bound a collaborator call by the configured timeout. An expired call
    /// surfaces as a client timeout, like one cut off by the HTTP client.
    async fn bounded<T, F>(
        &self,
        method: &str,
        target: &str,
        call: F,
    ) -> std::result::Result<T, ClientError>
    where
        F: Future<Output = std::result::Result<T, ClientError>>,
    {
        tokio::time::timeout(self.config.call_timeout, call)
            .await
            .unwrap_or_else(|_| Err(ClientError::timeout(method, target)))
    }
}

fn log_report(report: &TickReport) {
    if report.is_idle() {
        return;
    }
    info!(
        considered = report.considered,
        bound = report.bound.len(),
        skipped = report.skipped.len(),
        "Scheduling cycle complete"
    );
}
