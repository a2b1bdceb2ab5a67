use anyhow::{Context, Result};
use cott_config::{FileRotation, LogFormat, LogLevel, LogTarget, LoggingConfig};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Flushes the file target when dropped
pub type LoggingGuard = WorkerGuard;

/// Initialize logging from configuration
///
/// Every target gets its own filter: the target's level if set, otherwise
/// the config-wide level. The returned guard must outlive the run, or
/// buffered file output is lost.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<LoggingGuard>> {
    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(config.targets.len());
    let mut guard = None;

    for target in &config.targets {
        match target {
            LogTarget::Console { level } => {
                let filter = build_filter(level.unwrap_or(config.level));
                layers.push(
                    format_layer(config, std::io::stderr, true)
                        .with_filter(filter)
                        .boxed(),
                );
            }
            LogTarget::File {
                path,
                level,
                rotation,
            } => {
                let appender = file_appender(path, *rotation)?;
                let (writer, file_guard) = tracing_appender::non_blocking(appender);
                guard = Some(file_guard);

                let filter = build_filter(level.unwrap_or(config.level));
                layers.push(format_layer(config, writer, false).with_filter(filter).boxed());
            }
        }
    }

    // Use try_init to avoid panic if global subscriber already set
    if tracing_subscriber::registry().with(layers).try_init().is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(guard)
}

/// Initialize simple tracing for basic console output
///
/// Used before the configuration has been loaded.
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_new(log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Filter for one target: the configured level, `RUST_LOG` only as a fallback
pub fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_new(level.as_str())
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn format_layer<W>(config: &LoggingConfig, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    match config.format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
    }
}

fn file_appender(path: &Path, rotation: FileRotation) -> Result<RollingFileAppender> {
    let (directory, file_name) = split_log_path(path)?;
    std::fs::create_dir_all(&directory)
        .with_context(|| format!("Failed to create log directory {:?}", directory))?;

    let appender = match rotation {
        FileRotation::Never => tracing_appender::rolling::never(directory, file_name),
        FileRotation::Hourly => tracing_appender::rolling::hourly(directory, file_name),
        FileRotation::Daily => tracing_appender::rolling::daily(directory, file_name),
    };
    Ok(appender)
}

fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path {:?} does not name a file", path))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((directory, PathBuf::from(file_name)))
}
