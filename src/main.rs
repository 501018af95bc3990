use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use apitap_cli::replay::{self, ReplayOptions};
use capture_tap::SessionConfig;
use export_store::ExportConfig;

#[derive(Parser)]
#[command(name = "apitap", version, about = "Capture API traffic and export it as a JSON artifact")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSONL wire-event stream through a capture session and
    /// export the recorded calls.
    Capture(CaptureArgs),
}

#[derive(Args)]
struct CaptureArgs {
    /// Wire-event stream, one JSON event per line.
    #[arg(long)]
    events: PathBuf,

    /// URL fragment selecting in-scope calls; repeatable, empty means all.
    #[arg(long = "filter")]
    filters: Vec<String>,

    /// Upper bound on the capture window.
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    duration: Duration,

    /// How long to wait for in-flight calls at stop.
    #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
    grace: Duration,

    /// Originating page address recorded in the artifact.
    #[arg(long, default_value = "")]
    page_url: String,

    /// Destination file for the artifact.
    #[arg(long, default_value = "api_capture.json")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Capture(args) => {
            let session = SessionConfig {
                window_ms: args.duration.as_millis() as u64,
                grace_ms: args.grace.as_millis() as u64,
                filter: args.filters,
                page_url: args.page_url,
                ..SessionConfig::default()
            };
            let export = ExportConfig { path: args.out };
            let report = replay::run(&ReplayOptions {
                events: args.events,
                session,
                export,
            })
            .await?;
            println!(
                "exported {} calls to {}",
                report.total_captured,
                report.path.display()
            );
        }
    }
    Ok(())
}
