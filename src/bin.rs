//! Binary entry point for `pomodoro-bot`.
//!
//! This module provides the command-line interface for pomodoro-bot with options
//! for configuration file paths and logging verbosity. It initializes logging,
//! loads the configuration, and starts the service.

use clap::Parser;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use pomodoro_bot::base::{config::Config, types::Void};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Pomodoro-bot – countdown timers over Telegram.
///
/// Configuration can come from `config.toml` or environment variables
/// prefixed with `POMODORO_BOT_`.
#[derive(Parser, Debug)]
#[command(version, author, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the bot will look for a config file at `.hidden/config.toml`
    /// in the current directory.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: INFO level (DEBUG if `enable_debug_logs` is set)
    /// - -v: DEBUG level
    /// - -vv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Main entry point for the pomodoro-bot binary.
///
/// Loads configuration, sets up logging based on verbosity, and starts the bot.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;

    // Construct the level filter.

    let level = match (args.verbose, config.enable_debug_logs) {
        (0, false) => tracing::Level::INFO,
        (0, true) | (1, _) => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Prepare the log layer.

    let stdout = tracing_subscriber::fmt::layer()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    // Prepare the otlp layer, if an endpoint is configured.

    let otel = match &config.otlp_endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_protocol(Protocol::HttpBinary)
                .with_endpoint(endpoint.clone())
                .build()?;
            let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_batch_exporter(exporter).build().tracer("pomodoro-bot");

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry().with(otel).with(level_filter).with(stdout).init();

    pomodoro_bot::start(config).await
}
