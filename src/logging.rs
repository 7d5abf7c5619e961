use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize JSON logging, either to stdout or to a single append-only file
///
/// - Uses RUST_LOG for level filtering (defaults to "info" if not set)
/// - Flattens event fields so every line is one flat JSON object
pub fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).json().flatten_event(true);

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .context("SELF_LOG_PATH has no file name")?
                .to_string_lossy()
                .into_owned();

            // Never rotates, so the file name is used exactly as configured
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name)
                .build(dir)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            builder.with_writer(appender).with_ansi(false).init();
        }
        None => builder.init(),
    }

    Ok(())
}
