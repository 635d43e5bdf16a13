//! Log output: console plus an optional rolling file.

use std::path::Path;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "carpark_server=info,tower_http=info";

const LOG_FILE_PREFIX: &str = "carpark_finder";

/// Rotated files kept on disk.
const MAX_LOG_FILES: usize = 5;

/// Daily-rotated log file appender writing into `dir`.
pub fn file_appender(dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
}

/// Install the global subscriber.
///
/// Logs always go to stdout. With `log_dir`, they are also written to a
/// rolling file there; the returned guard flushes it on drop and must be
/// held for the life of the process. If the file cannot be opened the
/// server keeps running with console logging only.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let mut failure = None;
    let (file_layer, guard) = match log_dir.map(file_appender) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            failure = Some(e);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    if let Some(e) = failure {
        warn!(error = %e, "file logging disabled");
    }
    guard
}
