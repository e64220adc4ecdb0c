/// Telemetry Module - Structured Logging with Tracing
///
/// - Structured logging with tracing
/// - JSON vs pretty format support
/// - File logging with daily/hourly rotation
/// - RUST_LOG env var support, which wins over the configured level

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Telemetry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub log_level: String,
    /// Log format: "json" or "pretty"
    pub log_format: String,
    /// Optional log file path (None = console only)
    pub log_file: Option<String>,
    /// Rotation interval: "daily", "hourly", "never"
    pub rotation: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            log_file: None,
            rotation: "daily".to_string(),
        }
    }
}

fn file_appender(path: &str, rotation: &str) -> Result<rolling::RollingFileAppender, String> {
    let path = std::path::Path::new(path);
    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => std::path::Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or("Invalid log file path: no filename")?;
    let prefix = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    Ok(match rotation {
        "hourly" => rolling::hourly(directory, prefix),
        "never" => rolling::never(directory, file_name),
        _ => rolling::daily(directory, prefix),
    })
}

/// Initialize the global tracing subscriber.
///
/// The returned guard flushes buffered file output when dropped; hold it
/// for the life of the process.
pub fn init_tracing(
    config: TelemetryConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let json = config.log_format == "json";

    if let Some(log_file) = &config.log_file {
        let appender = file_appender(log_file, &config.rotation)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        if json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_current_span(true).with_writer(writer))
                .try_init()?;
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_ansi(false).with_target(false).with_writer(writer))
                .try_init()?;
        }
        return Ok(Some(guard));
    }

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()?;
    }
    Ok(None)
}

/// Truncate a long string for logging
///
/// Example: "0a1b2c3d4e5f67890a1b2c3d4e5f6789" (16) → "0a1b2c3d4e5f6789..."
pub fn truncate_hex(hex: &str, len: usize) -> String {
    match hex.char_indices().nth(len) {
        Some((idx, _)) => format!("{}...", &hex[..idx]),
        None => hex.to_string(),
    }
}
