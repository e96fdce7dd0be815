use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CHECK_DELAY: Duration = Duration::from_secs(5);

/// Timing knobs handed to the monitor and its connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Upper bound for every connect, request and reply.
    pub connect_timeout: Duration,
    /// Sleep between two checking cycles.
    pub check_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            check_delay: DEFAULT_CHECK_DELAY,
        }
    }
}

/// Where and how the log stream is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Directory holding the rotated log files. `None` disables the file sink.
    pub dir: Option<PathBuf>,
    pub file_prefix: String,
    /// Rotated files kept on disk.
    pub max_files: usize,
    pub stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: Some(std::env::temp_dir()),
            file_prefix: "solikv-sentinel.log".to_string(),
            max_files: 5,
            stderr: false,
        }
    }
}
