use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is not set
fn default_directives(verbose: bool) -> &'static str {
    if verbose { "mortar=debug,mortar_cli=debug" } else { "mortar=info,mortar_cli=info" }
}

/// Initialize logging for the mortar CLI
///
/// Events always go to stderr. When `log_dir` is given they are also
/// written there, rotated daily with the pattern `mortar.log.YYYY-MM-DD`.
///
/// The log level can be controlled via the RUST_LOG environment variable:
/// - RUST_LOG=debug mortar serve app.toml  (verbose logging)
/// - RUST_LOG=error mortar serve app.toml  (errors only)
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the life of the process.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let (file, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let appender = tracing_appender::rolling::daily(dir, "mortar.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file)
        .with(stderr)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(dir) = log_dir {
        tracing::debug!("Logging initialized to {}", dir.display());
    }

    Ok(guard)
}
