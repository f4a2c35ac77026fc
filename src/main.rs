//! npmscout binary entrypoint kept minimal. The command handlers live in `npmscout::args`.

use std::fmt;
use std::process::ExitCode;

use clap::Parser;
use npmscout::args::{Args, determine_log_level, process_args};
use npmscout::settings::{load_settings, logs_dir};

struct NpmscoutTimer;

impl tracing_subscriber::fmt::time::FormatTime for NpmscoutTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let ts = chrono::Local::now().format("%Y-%m-%d-T %H:%M:%S").to_string();
        w.write_str(&ts)
    }
}

/// Filter from `RUST_LOG` if set, otherwise from `level`.
fn env_filter(level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
}

/// What: Initialize tracing to `<config>/logs/npmscout.log`, or stderr if that fails.
///
/// Inputs:
/// - `level`: Default filter when `RUST_LOG` is unset
///
/// Output:
/// - The file writer's guard; buffered lines are flushed when it drops.
fn init_logging(level: &str) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let opened = logs_dir().and_then(|dir| {
        let path = dir.join("npmscout.log");
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map(|file| (path, file))
    });
    match opened {
        Ok((path, file)) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(level))
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_timer(NpmscoutTimer)
                .init();
            tracing::info!(path = %path.display(), "logging initialized");
            Some(guard)
        }
        Err(e) => {
            // Fallback: stderr logger so failures are still visible
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(level))
                .with_target(false)
                .with_ansi(true)
                .with_writer(std::io::stderr)
                .with_timer(NpmscoutTimer)
                .init();
            tracing::warn!(error = %e, "failed to open log file; using stderr");
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _log_guard = init_logging(&determine_log_level(&args));

    let settings = args.apply_to(load_settings());
    tracing::info!(
        registry = %settings.registry_url,
        downloads = %settings.downloads_url,
        page_size = settings.page_size,
        "npmscout starting"
    );
    let code = process_args(&args, &settings).await;
    tracing::info!(code, "npmscout exited");
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
