mod args;
mod error;
mod render;
mod shared;
mod sink;

use crate::args::{Cli, Command, PrintArgs, ReadArgs};
use crate::error::AppError;
use crate::render::LineRenderer;
use crate::shared::SharedBuffer;
use crate::sink::LineOutput;
use clap::Parser;
use nowlyric_core::{CoreError, FfprobeDurationProbe, LyricPoller, NowLyricConfig, Session};
use nowlyric_mpris::{MprisBus, MprisListener};
use std::fs::File;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load config or create template on first run
    let (config, created_at) = match NowLyricConfig::load_or_create() {
        Ok(config) => (config, None),
        Err(CoreError::ConfigNotFound { path }) => (NowLyricConfig::default(), Some(path)),
        Err(e) => {
            eprintln!(
                "Failed to load config from {}: {e}",
                NowLyricConfig::config_path().display()
            );
            return ExitCode::FAILURE;
        }
    };

    let with_log = matches!(&cli.command, Command::Print(args) if args.with_log);
    init_tracing(with_log, config.logging.enabled);

    if let Some(path) = created_at {
        info!("Created config template at {}", path.display());
    }

    let result = match cli.command {
        Command::Print(args) => print_command(&args, config),
        Command::Read(args) => read_command(&args, &config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// `nowlyric print`: follow players and print lyric lines until Ctrl+C
fn print_command(args: &PrintArgs, mut config: NowLyricConfig) -> Result<(), AppError> {
    args.apply(&mut config);

    let runtime = tokio::runtime::Runtime::new().map_err(AppError::Runtime)?;

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    runtime.block_on(follow_players(config, cancel_token))
}

async fn follow_players(
    config: NowLyricConfig,
    cancel_token: CancellationToken,
) -> Result<(), AppError> {
    let output_config = &config.output;

    let mut output = LineOutput::new(LineRenderer::from_config(output_config), std::io::stdout());
    if let Some(path) = &output_config.output_path {
        output = output.with_output_file(path);
    }
    if output_config.shared_memory {
        let path = &output_config.shared_memory_path;
        let shared = SharedBuffer::create(path, output_config.shared_memory_size)
            .and_then(|buffer| buffer.write(&output_config.default_content).map(|()| buffer))
            .map_err(|source| AppError::SharedBuffer {
                path: path.clone(),
                source,
            })?;
        info!("Publishing lyrics to {}", path.display());
        output = output.with_shared_buffer(shared);
    }

    let bus = MprisBus::connect(Duration::from_millis(config.sync.bus_timeout_ms)).await?;
    let probe = FfprobeDurationProbe::new(Duration::from_millis(config.sync.probe_timeout_ms));
    let connection = bus.connection().clone();

    let session = Session::new(Arc::new(bus), Arc::new(probe), Box::new(output));

    let poller = Arc::new(LyricPoller::new(
        session.clone(),
        config.sync.poll_interval_ms,
        Some(cancel_token.clone()),
    ));
    let listener = MprisListener::new(connection, session, Some(cancel_token.clone()));

    let poller_handle = poller.start();

    eprintln!(
        "The lyrics monitoring process is ready. It will take effect when you start playing music or switch to the next song."
    );

    let result = listener.run().await;

    // Stop the poller too if the listener ended on its own
    cancel_token.cancel();
    if let Err(e) = poller_handle.await {
        error!("Lyric poller task failed: {}", e);
    }

    result.map_err(AppError::from)
}

/// `nowlyric read`: print the line currently held in the shared buffer
fn read_command(args: &ReadArgs, config: &NowLyricConfig) -> Result<(), AppError> {
    let path = args
        .path
        .as_ref()
        .unwrap_or(&config.output.shared_memory_path);
    let content = SharedBuffer::read(path, config.output.shared_memory_size).map_err(|source| {
        AppError::SharedBuffer {
            path: path.clone(),
            source,
        }
    })?;
    println!("{content}");
    Ok(())
}

/// Initialize tracing with stderr output and optional file logging
fn init_tracing(with_log: bool, file_logging_enabled: bool) {
    let default_filter = if with_log { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stdout carries the lyric lines
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = nowlyric_core::paths::log_file_path();

        // Create cache directory if needed
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
