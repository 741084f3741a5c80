//! Core logging bootstrap.
//!
//! # Responsibility
//! - Start file-based rolling logs once per process from `LoggingConfig`.
//! - Capture panics as metadata-only log events.
//!
//! # Invariants
//! - Initialization is idempotent for an identical config and never panics.
//! - Re-initialization with a different level or directory is rejected.
//! - Log lines carry ids, namespaces and counts, never record contents.

use crate::config::LoggingConfig;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::panic::PanicHookInfo;

const LOG_FILE_BASENAME: &str = "vistabuena";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    config: LoggingConfig,
    _handle: LoggerHandle,
}

/// Starts core logging, or confirms it already runs with `config`.
///
/// # Errors
/// - `log_dir` is not absolute or cannot be created.
/// - Logging already runs with a different level or directory.
/// - The logger backend fails to start.
pub fn init_logging(config: &LoggingConfig) -> Result<(), String> {
    let level = normalize_level(config.level)?;
    if !config.log_dir.is_absolute() {
        return Err(format!(
            "log_dir must be an absolute path, got `{}`",
            config.log_dir.display()
        ));
    }
    let wanted = LoggingConfig {
        level,
        log_dir: config.log_dir.clone(),
    };

    let state = LOGGING_STATE.get_or_try_init(|| start_logger(&wanted))?;
    ensure_same_config(&state.config, &wanted)
}

/// Returns the active logging config, if logging has been initialized.
pub fn logging_status() -> Option<LoggingConfig> {
    LOGGING_STATE.get().map(|state| state.config.clone())
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Maps a user-supplied level onto the supported set.
pub(crate) fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn start_logger(config: &LoggingConfig) -> Result<LoggingState, String> {
    std::fs::create_dir_all(&config.log_dir).map_err(|err| {
        format!(
            "failed to create log directory `{}`: {err}",
            config.log_dir.display()
        )
    })?;

    let handle = Logger::try_with_str(config.level)
        .map_err(|err| format!("invalid log level `{}`: {err}", config.level))?
        .log_to_file(
            FileSpec::default()
                .directory(config.log_dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    install_panic_hook();

    info!(
        "event=core_init module=core status=ok platform={} version={} level={} log_dir={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION"),
        config.level,
        config.log_dir.display()
    );

    Ok(LoggingState {
        config: config.clone(),
        _handle: handle,
    })
}

fn ensure_same_config(active: &LoggingConfig, wanted: &LoggingConfig) -> Result<(), String> {
    if active.log_dir != wanted.log_dir {
        return Err(format!(
            "logging already initialized at `{}`; refusing to switch to `{}`",
            active.log_dir.display(),
            wanted.log_dir.display()
        ));
    }
    if active.level != wanted.level {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            active.level, wanted.level
        ));
    }
    Ok(())
}

// Only called from inside the OnceCell initializer, so it runs at most once.
fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic_captured module=core status=error location={location} payload={}",
            panic_payload_summary(panic_info)
        );
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}
