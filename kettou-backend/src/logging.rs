use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tokio::task;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Keeps the file writer flushing; hold it until exit
#[allow(dead_code)]
pub struct LoggerGuard(WorkerGuard);

/// Console (stderr) and daily rolling file logging.
///
/// `level` is the default directive; `RUST_LOG` overrides it. Search results
/// go to stdout, so the console layer writes to stderr.
pub fn init_logging(log_dir: impl AsRef<Path>, prefix: &str, level: &str) -> Result<LoggerGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();

    let (level, level_ok) = match level.to_ascii_lowercase() {
        l if LOG_LEVELS.contains(&l.as_str()) => (l, true),
        _ => ("info".to_string(), false),
    };

    let builder = EnvFilter::builder().with_default_directive(
        level
            .parse()
            .context(format!("Invalid log level '{}'", level))?,
    );
    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();
    let console_filter = builder.clone().parse_lossy(&rust_log);
    let file_filter = builder.parse_lossy(&rust_log);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .context(format!("Failed to create log appender in {}", log_dir.display()))?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Logging already initialized")?;

    if !level_ok {
        tracing::warn!("Invalid log level in config, defaulting to 'info'");
    }

    start_log_cleanup_task(log_dir, prefix.to_string());

    Ok(LoggerGuard(guard))
}

fn start_log_cleanup_task(log_dir: PathBuf, prefix: String) {
    const MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);
    const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

    task::spawn(async move {
        loop {
            if let Err(e) = cleanup_old_logs(&log_dir, &prefix, MAX_AGE) {
                tracing::warn!("Failed to delete old log file: {}", e);
            }
            tokio::time::sleep(CLEANUP_INTERVAL).await;
        }
    });
}

/// Delete `{prefix}*.log` files last modified more than `max_age` ago
fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.starts_with(prefix) || !file_name.ends_with(".log") {
            continue;
        }
        let modified = fs::metadata(&path)?.modified()?;
        if now.duration_since(modified).unwrap_or_default() > max_age {
            fs::remove_file(&path)?;
            tracing::info!("Old log file deleted: {}", file_name);
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_keeps_fresh_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("kettou.2025-05-04.log"), "x").unwrap();
        fs::write(dir.path().join("other.2025-05-04.log"), "x").unwrap();
        fs::write(dir.path().join("kettou.txt"), "x").unwrap();

        let removed = cleanup_old_logs(dir.path(), "kettou", Duration::from_secs(3600)).unwrap();
        assert_eq!(removed, 0);

        // every matching file is older than a zero max age
        std::thread::sleep(Duration::from_millis(20));
        let removed = cleanup_old_logs(dir.path(), "kettou", Duration::ZERO).unwrap();
        assert_eq!(removed, 1);
        assert!(dir.path().join("other.2025-05-04.log").exists());
        assert!(dir.path().join("kettou.txt").exists());
    }
}
