use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

pub const LOG_FILE_PREFIX: &str = "consent.log";

/// Keeps the non-blocking file writer alive; drop it last.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    session_id: Uuid,
}

impl LoggingGuard {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

/// Outcome of one retention sweep over the log directory.
#[derive(Debug, Default)]
pub struct RetentionReport {
    pub removed: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

pub fn init_tracing(logging_config: &LoggingConfig) -> Result<LoggingGuard> {
    let env_filter = build_env_filter(&logging_config.filter)?;
    let log_dir = resolve_log_dir(&logging_config.dir)?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;

    let retention = sweep_expired_logs(
        &log_dir,
        LOG_FILE_PREFIX,
        logging_config.retention_days,
        SystemTime::now(),
    );
    let (writer, worker_guard) =
        tracing_appender::non_blocking(rolling_appender(&log_dir, &logging_config.rotation));

    let json_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(env_filter);

    let stderr_layer = logging_config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let session_id = Uuid::now_v7();
    tracing::info!(
        target: "logging",
        session_id = %session_id,
        dir = %log_dir.display(),
        filter = %logging_config.filter,
        rotation = ?logging_config.rotation,
        retention_days = logging_config.retention_days,
        expired_removed = retention.removed.len(),
        "logging_initialized"
    );
    for warning in &retention.warnings {
        tracing::warn!(target: "logging", warning = %warning, "logging_retention_warning");
    }

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        session_id,
    })
}

fn build_env_filter(filter: &str) -> Result<EnvFilter> {
    if filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    EnvFilter::try_new(filter).with_context(|| format!("failed to parse logging.filter '{filter}'"))
}

fn rolling_appender(log_dir: &Path, rotation: &LoggingRotation) -> RollingFileAppender {
    match rotation {
        LoggingRotation::Daily => rolling::daily(log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => rolling::hourly(log_dir, LOG_FILE_PREFIX),
    }
}

fn resolve_log_dir(dir: &Path) -> Result<PathBuf> {
    if dir.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve relative logging.dir")?;
    Ok(cwd.join(dir))
}

/// Removes files named `prefix*` whose mtime is at or before `now - retention_days`.
pub fn sweep_expired_logs(
    log_dir: &Path,
    prefix: &str,
    retention_days: usize,
    now: SystemTime,
) -> RetentionReport {
    let mut report = RetentionReport::default();
    let retention = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60) as u64);
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => {
            report
                .warnings
                .push(format!("failed to scan {}: {err}", log_dir.display()));
            return report;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                report
                    .warnings
                    .push(format!("failed to read log directory entry: {err}"));
                continue;
            }
        };
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }

        let path = entry.path();
        let modified = entry.metadata().and_then(|metadata| {
            if metadata.is_file() {
                metadata.modified().map(Some)
            } else {
                Ok(None)
            }
        });
        match modified {
            Ok(Some(modified)) if modified <= cutoff => match fs::remove_file(&path) {
                Ok(()) => report.removed.push(path),
                Err(err) => report
                    .warnings
                    .push(format!("failed to remove {}: {err}", path.display())),
            },
            Ok(_) => {}
            Err(err) => report
                .warnings
                .push(format!("failed to stat {}: {err}", path.display())),
        }
    }

    report
}
