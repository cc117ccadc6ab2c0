use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod k8s;
mod logs;
mod types;

use k8s::KubeClient;
use logs::{LogAggregator, TailController};
use types::TailRequest;

/// Deptail - tail merged logs from every pod of a deployment
#[derive(Parser, Debug)]
#[command(name = "deptail")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Deployment whose pods to tail
    #[arg(value_name = "DEPLOYMENT")]
    deployment: String,

    /// Container to read from (defaults to each pod's only container)
    #[arg(short, long)]
    container: Option<String>,

    /// Follow the logs
    #[arg(short, long)]
    follow: bool,

    /// Start from only the last N lines per pod
    #[arg(short = 'n', long = "tail", value_name = "N")]
    tail: Option<i64>,

    /// Kubernetes context name (defaults to the current context)
    #[arg(long)]
    context: Option<String>,

    /// Namespace (defaults to the context's namespace)
    #[arg(long)]
    namespace: Option<String>,

    /// Disable colored pod tags
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    run(args).await
}

async fn run(args: Args) -> Result<ExitCode> {
    let client = KubeClient::connect(args.context.as_deref(), args.namespace.as_deref()).await?;

    let pods = client.resolve_pods(&args.deployment).await?;
    if pods.is_empty() {
        // Nothing matched; not an error.
        info!(
            deployment = %args.deployment,
            namespace = client.namespace(),
            "no pods found"
        );
        return Ok(ExitCode::SUCCESS);
    }

    let use_color = !args.no_color && std::io::stdout().is_terminal();
    let aggregator = Arc::new(LogAggregator::new(
        Box::new(std::io::stdout()),
        &pods,
        use_color,
    ));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let request = TailRequest::new(pods)
        .with_container(args.container)
        .with_follow(args.follow)
        .with_tail_lines(args.tail);

    let controller = TailController::new(Arc::new(client.log_transport()), aggregator, cancel);
    let summary = controller.run(&request).await;

    if summary.all_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(
            failed = summary.failed,
            started = summary.started,
            "some pod streams failed"
        );
        Ok(ExitCode::FAILURE)
    }
}
