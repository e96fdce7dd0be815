//! Log sink setup: a daily-rotated file, optionally mirrored to stderr.

use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::LogConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. Keep the returned guards alive for the
/// lifetime of the process, or buffered lines are lost on exit.
pub fn init(config: &LogConfig) -> io::Result<Vec<WorkerGuard>> {
    let (layers, guards) = build_layers(config)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(guards)
}

fn build_layers(config: &LogConfig) -> io::Result<(Vec<BoxedLayer>, Vec<WorkerGuard>)> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guards = Vec::new();

    if let Some(dir) = &config.dir {
        std::fs::create_dir_all(dir)?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(&config.file_prefix)
            .max_log_files(config.max_files.max(1))
            .build(dir)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed(),
        );
        guards.push(guard);
    }

    if config.stderr || config.dir.is_none() {
        layers.push(fmt::layer().with_writer(io::stderr).with_target(true).boxed());
    }

    Ok((layers, guards))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("logs");
        let config = LogConfig {
            dir: Some(dir.clone()),
            ..LogConfig::default()
        };
        let (layers, guards) = build_layers(&config).unwrap();
        assert!(dir.is_dir());
        assert_eq!(layers.len(), 1);
        assert_eq!(guards.len(), 1);
    }

    #[test]
    fn test_stderr_fallback_without_dir() {
        let config = LogConfig {
            dir: None,
            ..LogConfig::default()
        };
        let (layers, guards) = build_layers(&config).unwrap();
        assert_eq!(layers.len(), 1);
        assert!(guards.is_empty());
    }

    #[test]
    fn test_file_and_stderr() {
        let root = tempfile::tempdir().unwrap();
        let config = LogConfig {
            dir: Some(root.path().to_path_buf()),
            stderr: true,
            ..LogConfig::default()
        };
        let (layers, guards) = build_layers(&config).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(guards.len(), 1);
    }
}
