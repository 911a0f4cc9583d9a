use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use conveyor_core::app::{App, AppBuilder, LogFormat, StopHandle, WorkerConfig};
use conveyor_core::domain::Source;
use conveyor_core::impls::FileMessageQueue;
use conveyor_core::ports::SystemClock;
use conveyor_core::typed::{Runnable, TaskEnvelope};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod tasks;

use tasks::{FlakyTask, GreetTask};

#[derive(Debug, Parser)]
#[command(name = "conveyor", version, about = "Message queue worker")]
struct Cli {
    /// Root directory of the file-backed queue (overrides CONVEYOR_QUEUE_DIR).
    #[arg(long, global = true)]
    queue_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Consume tasks from a queue.
    #[command(name = "queue:worker")]
    Worker {
        queue: String,

        /// Keep polling instead of exiting once the queue is empty.
        #[arg(short, long)]
        daemon: bool,

        /// Idle wait between polls in daemon mode (overrides CONVEYOR_POLL_INTERVAL_MS).
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// Publish a task onto a queue.
    #[command(name = "queue:send")]
    Send {
        queue: String,

        task_type: String,

        /// Task payload as JSON.
        #[arg(long, default_value = "{}")]
        payload: String,

        /// Seconds before the message becomes visible.
        #[arg(long, default_value_t = 0)]
        delay: u64,

        /// Send PAYLOAD verbatim as the message body, without a task envelope.
        #[arg(long)]
        raw: bool,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}

fn build_app(config: WorkerConfig) -> Result<App> {
    let queue = Arc::new(FileMessageQueue::new(
        config.queue_dir.clone(),
        SystemClock,
        config.visibility_timeout,
    ));
    let app = AppBuilder::new(queue)
        .register::<GreetTask>()?
        .register::<FlakyTask>()?
        .expect_tasks(&[GreetTask::TYPE, FlakyTask::TYPE])
        .with_config(config)
        .build()?;
    Ok(app)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("failed to listen for Ctrl+C") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}

/// First signal stops the consumer gracefully, a second one exits at once.
fn spawn_signal_handler(handle: StopHandle) {
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            warn!(error = %e, "signal handling unavailable");
            return;
        }
        eprintln!("Received stop signal, gracefully stopping (signal again to force quit)...");
        info!("gracefully stopping");
        handle.stop();

        if shutdown_signal().await.is_ok() {
            warn!("second stop signal, exiting immediately");
            std::process::exit(130);
        }
    });
}

async fn run_worker(app: App, queue: &str, daemon: bool) -> Result<()> {
    let source = Source::new(queue)?;
    let mut consumer = app.consumer(source.clone())?;
    spawn_signal_handler(consumer.stop_handle());

    info!(source = %source, daemon, task_types = ?app.registered_types(), "worker starting");
    if daemon {
        consumer.receive().await?;
    } else {
        let processed = consumer.drain().await?;
        info!(source = %source, processed, stats = ?consumer.stats(), "queue drained");
    }
    Ok(())
}

async fn run_send(
    app: App,
    queue: &str,
    task_type: String,
    payload: String,
    delay: u64,
    raw: bool,
) -> Result<()> {
    let source = Source::new(queue)?;
    let body = if raw {
        payload.into_bytes()
    } else {
        let payload: serde_json::Value =
            serde_json::from_str(&payload).context("--payload is not valid JSON")?;
        serde_json::to_vec(&TaskEnvelope { task_type, payload })?
    };

    let id = app
        .producer()
        .send_raw(&source, body, Duration::from_secs(delay))
        .await?;
    println!("{id}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = WorkerConfig::from_env()?;
    if let Some(dir) = cli.queue_dir {
        config.queue_dir = dir;
    }
    if let Command::Worker {
        poll_interval_ms: Some(ms),
        ..
    } = &cli.command
    {
        config.poll_interval = Duration::from_millis(*ms);
    }
    init_tracing(config.log_format);

    let app = build_app(config)?;
    match cli.command {
        Command::Worker { queue, daemon, .. } => run_worker(app, &queue, daemon).await,
        Command::Send {
            queue,
            task_type,
            payload,
            delay,
            raw,
        } => run_send(app, &queue, task_type, payload, delay, raw).await,
    }
}
