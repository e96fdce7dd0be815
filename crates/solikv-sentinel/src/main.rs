use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use solikv_sentinel::{logging, Cluster, LogConfig, Monitor, MonitorConfig, NodeAddr, RespConnector};

#[derive(Parser, Debug)]
#[command(
    name = "solikv-sentinel",
    about = "Keeps one primary alive in a SoliKV/Redis replication group"
)]
struct Args {
    /// Cluster members as ip[:port] (port defaults to 6379)
    #[arg(required = true, num_args = 1.., value_name = "IP:PORT")]
    endpoints: Vec<NodeAddr>,

    /// Timeout for every connection and request, in seconds
    #[arg(long, default_value = "5")]
    connect_timeout_secs: u64,

    /// Delay between two checks, in seconds
    #[arg(long, default_value = "5")]
    check_delay_secs: u64,

    /// Cluster name used in log lines
    #[arg(long, default_value = "default")]
    name: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory for rotated log files
    #[arg(long, default_value_os_t = std::env::temp_dir())]
    log_dir: PathBuf,

    /// Also write logs to stderr
    #[arg(long)]
    log_stderr: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_config = LogConfig {
        level: args.log_level.clone(),
        dir: Some(args.log_dir.clone()),
        stderr: args.log_stderr,
        ..LogConfig::default()
    };
    let _guards = match logging::init(&log_config) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("failed to set up logging in {:?}: {}", args.log_dir, e);
            return ExitCode::FAILURE;
        }
    };

    let config = MonitorConfig {
        connect_timeout: Duration::from_secs(args.connect_timeout_secs.max(1)),
        check_delay: Duration::from_secs(args.check_delay_secs),
    };

    tracing::info!(
        "solikv-sentinel starting with {} endpoint(s), timeout {:?}, delay {:?}",
        args.endpoints.len(),
        config.connect_timeout,
        config.check_delay
    );

    let connector = Arc::new(RespConnector::new(config.connect_timeout));
    let cluster = match Cluster::discover(args.name.as_str(), &args.endpoints, connector).await {
        Ok(cluster) => cluster,
        Err(e) => {
            tracing::error!(error = %e, "cannot configure cluster");
            return ExitCode::FAILURE;
        }
    };

    let mut monitor = Monitor::new(cluster, config);
    tokio::select! {
        err = monitor.run() => {
            tracing::error!(error = %err, "monitoring stopped: cluster needs operator attention");
            ExitCode::FAILURE
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            ExitCode::SUCCESS
        }
    }
}
