//! Logging setup.
//!
//! - Console and daily rolling file output, both with local timezone
//!   timestamps
//! - Filter from `RUST_LOG`, falling back to the configured directive
//! - Log file retention cleanup (deletes logs older than 7 days)

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::{Error, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "greenhouse=info";

/// File name prefix of the rolling log files (`greenhouse.log.YYYY-MM-DD`).
const LOG_FILE_PREFIX: &str = "greenhouse.log";

/// Log retention period in days.
const LOG_RETENTION_DAYS: i64 = 7;

/// Formats timestamps in the host's local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Installed logging. Keep it alive for the lifetime of the program so the
/// file writer flushes on exit.
pub struct Logging {
    log_dir: PathBuf,
    _guard: WorkerGuard,
}

impl Logging {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Start the log retention cleanup task.
    ///
    /// Runs once at startup and then daily until `cancel_token` fires.
    pub fn start_retention_cleanup(&self, cancel_token: CancellationToken) {
        let log_dir = self.log_dir.clone();

        tokio::spawn(async move {
            let cleanup_interval = Duration::from_secs(24 * 60 * 60);

            loop {
                if let Err(e) =
                    cleanup_old_logs(&log_dir, Utc::now().date_naive(), LOG_RETENTION_DAYS).await
                {
                    warn!(error = %e, "Failed to clean up old logs");
                }

                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        debug!("Log retention cleanup task shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(cleanup_interval) => {}
                }
            }
        });
    }
}

/// Build the filter: `RUST_LOG` wins, then `directive`, then the default.
fn build_filter(directive: Option<&str>) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = directive
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(DEFAULT_LOG_FILTER);
    EnvFilter::try_new(directive)
        .map_err(|e| Error::config(format!("invalid log filter '{}': {}", directive, e)))
}

/// Install the global subscriber.
///
/// Returns a [`Logging`] handle that owns the file writer guard.
pub fn init_logging(log_dir: &Path, directive: Option<&str>) -> Result<Logging> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(build_filter(directive)?)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(LocalTimer),
        )
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to set global default subscriber: {}", e)))?;

    Ok(Logging {
        log_dir: log_dir.to_path_buf(),
        _guard: guard,
    })
}

/// Date encoded in a rolling log file name, if it is one of ours.
fn log_file_date(filename: &str) -> Option<NaiveDate> {
    let date = filename.strip_prefix(LOG_FILE_PREFIX)?.strip_prefix('.')?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Delete rolling log files dated more than `retention_days` before `today`.
async fn cleanup_old_logs(
    log_dir: &Path,
    today: NaiveDate,
    retention_days: i64,
) -> std::io::Result<usize> {
    let cutoff = today - chrono::Duration::days(retention_days);

    let mut entries = tokio::fs::read_dir(log_dir).await?;
    let mut deleted_count = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(file_date) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(log_file_date)
        else {
            continue;
        };

        if file_date < cutoff {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to delete old log file");
            } else {
                deleted_count += 1;
                debug!(path = %path.display(), "Deleted old log file");
            }
        }
    }

    if deleted_count > 0 {
        info!(count = deleted_count, "Cleaned up old log files");
    }

    Ok(deleted_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn test_log_file_date() {
        assert_eq!(
            log_file_date("greenhouse.log.2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(log_file_date("greenhouse.log"), None);
        assert_eq!(log_file_date("other.log.2024-03-01"), None);
        assert_eq!(log_file_date("greenhouse.log.yesterday"), None);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_old_logs() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "greenhouse.log.2024-02-20",
            "greenhouse.log.2024-02-25",
            "greenhouse.log.2024-03-01",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let deleted = cleanup_old_logs(dir.path(), today, 7).await.unwrap();

        assert_eq!(deleted, 1);
        assert!(!dir.path().join("greenhouse.log.2024-02-20").exists());
        assert!(dir.path().join("greenhouse.log.2024-02-25").exists());
        assert!(dir.path().join("greenhouse.log.2024-03-01").exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
