use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use labelsched_client::{ApiClient, ApiClientConfig};
use labelsched_core::LabelKeys;
use labelsched_scheduler::{MatchPolicy, Scheduler, SchedulerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Slack added to the HTTP request timeout to bound a whole collaborator call
const CALL_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "labelsched", about = "Label-based Kubernetes pod scheduler")]
struct Cli {
    /// Log output format
    #[arg(
        long,
        global = true,
        env = "LABELSCHED_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text
    )]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule pending pods every interval until interrupted
    Run(SchedulerArgs),
    /// Run a single scheduling pass and exit
    Once(SchedulerArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
struct SchedulerArgs {
    /// Control-plane API URL
    #[arg(
        long,
        env = "LABELSCHED_API_URL",
        default_value = "http://localhost:8001"
    )]
    api_url: String,
    /// Scheduler name pods request in spec.schedulerName
    #[arg(
        long,
        env = "LABELSCHED_SCHEDULER_NAME",
        default_value = "my-scheduler"
    )]
    scheduler_name: String,
    /// Namespace to schedule pods in
    #[arg(long, env = "LABELSCHED_NAMESPACE", default_value = "default")]
    namespace: String,
    /// Delay between scheduling passes, in milliseconds
    #[arg(long, env = "LABELSCHED_INTERVAL_MS", default_value_t = 1000)]
    interval_ms: u64,
    /// Timeout for each control-plane request, in milliseconds
    #[arg(long, env = "LABELSCHED_REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    request_timeout_ms: u64,
    /// Label key holding the category attribute
    #[arg(long, env = "LABELSCHED_CATEGORY_LABEL", default_value = "category")]
    category_label: String,
    /// Label key holding the network attribute
    #[arg(long, env = "LABELSCHED_NETWORK_LABEL", default_value = "network")]
    network_label: String,
    /// How an unset pod label is matched: exact or absent-matches-any
    #[arg(long, env = "LABELSCHED_MATCH_POLICY", default_value = "exact")]
    match_policy: MatchPolicy,
    /// Extra header for binding requests, as 'Name: value'
    #[arg(long, env = "LABELSCHED_CUSTOM_HEADER")]
    custom_header: Option<String>,
    /// Fetch a fresh node list for every pod (false: once per pass)
    #[arg(
        long,
        env = "LABELSCHED_REFRESH_NODES_PER_POD",
        default_value_t = true,
        action = ArgAction::Set
    )]
    refresh_nodes_per_pod: bool,
}

impl SchedulerArgs {
    fn client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.api_url.clone(),
            namespace: self.namespace.clone(),
            label_keys: LabelKeys {
                category: self.category_label.clone(),
                network: self.network_label.clone(),
            },
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            custom_header: self.custom_header.clone(),
        }
    }

    fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            scheduler_name: self.scheduler_name.clone(),
            schedule_interval: Duration::from_millis(self.interval_ms),
            call_timeout: Duration::from_millis(self.request_timeout_ms) + CALL_TIMEOUT_SLACK,
            match_policy: self.match_policy,
            refresh_nodes_per_pod: self.refresh_nodes_per_pod,
        }
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_format);

    match cli.command {
        Commands::Run(args) => run_scheduler(&args).await,
        Commands::Once(args) => run_once(&args).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Build the scheduler wired to the control-plane client
fn build_scheduler(args: &SchedulerArgs) -> miette::Result<Scheduler> {
    let config = args.scheduler_config();
    config.validate()?;

    let client = Arc::new(ApiClient::new(args.client_config())?);
    info!(
        "Using control plane at {} (namespace '{}')",
        client.base_url(),
        client.namespace()
    );

    Ok(Scheduler::new(client.clone(), client, config))
}

/// Run the scheduling loop until ctrl-c
async fn run_scheduler(args: &SchedulerArgs) -> miette::Result<()> {
    let scheduler = build_scheduler(args)?;
    let token = CancellationToken::new();

    let scheduler_token = token.clone();
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.run(scheduler_token).await {
            error!("Scheduler error: {}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| miette::miette!("Failed to listen for ctrl-c: {}", e))?;

    info!("Shutting down gracefully...");
    token.cancel();

    // Each call of an in-flight pass is bounded, but a pass makes up to two calls
    // per pending pod, so this wait can cut a long pass short
    let shutdown_timeout = Duration::from_millis(args.request_timeout_ms) + CALL_TIMEOUT_SLACK;
    if join_scheduler(scheduler_handle, shutdown_timeout).await {
        info!("Shutdown complete");
    }

    Ok(())
}

/// Wait for the scheduler task, logging a panic or an overrun. Returns true
/// on a clean stop.
async fn join_scheduler(handle: JoinHandle<()>, limit: Duration) -> bool {
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!("Scheduler task failed: {}", e);
            false
        }
        Err(_) => {
            error!("Scheduler did not stop within {:?}", limit);
            false
        }
    }
}

/// Run exactly one scheduling pass
async fn run_once(args: &SchedulerArgs) -> miette::Result<()> {
    let scheduler = build_scheduler(args)?;

    let report = scheduler.schedule_cycle().await?;

    for binding in &report.bound {
        info!(
            "Bound pod {} to node {}",
            binding.pod_name, binding.node_name
        );
    }
    for skipped in &report.skipped {
        info!(
            "Skipped pod {} ({}): {}",
            skipped.pod_name, skipped.kind, skipped.reason
        );
    }
    info!(
        "Pass complete: {} pending, {} bound, {} skipped",
        report.considered,
        report.bound.len(),
        report.skipped.len()
    );

    Ok(())
}
