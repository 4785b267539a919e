//! Logging setup for the `bufferqueue` binary
//!
//! The library only emits records through the `log` macros. The binary picks a
//! `flexi_logger` backend here, in one of three formats:
//!
//! - `text`: `2026-01-01 12:00:00.000 INF message`
//! - `ext`: the text line followed by the source location `(queue/producer.rs:42)`
//! - `json`: one compact object per line with `timestamp`, `level`, `message`, `target`

use flexi_logger::{DeferredNow, FileSpec, Logger, LoggerHandle};
use std::sync::{Mutex, OnceLock};

// Dropping the handle would stop the logger
static LOGGER_HANDLE: OnceLock<Mutex<LoggerHandle>> = OnceLock::new();

/// Output shape selected by `--log-format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Extended,
    Json,
}

impl LogFormat {
    /// Parse a format name; unknown names fall back to `text`
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => LogFormat::Json,
            Some("ext") | Some("extended") => LogFormat::Extended,
            _ => LogFormat::Text,
        }
    }
}

/// Start the global logger
///
/// Fails if a logger was already installed in this process.
pub fn init_logging(
    log_level: Option<&str>,
    log_format: Option<&str>,
    log_file: Option<&str>,
    color_enabled: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut logger = Logger::try_with_str(log_level.unwrap_or("info"))?;

    // Colour never goes into files or JSON
    let color = color_enabled && log_file.is_none();
    logger = match (LogFormat::from_name(log_format), color) {
        (LogFormat::Json, _) => logger.format(json_format),
        (LogFormat::Extended, true) => logger.format(extended_color_format),
        (LogFormat::Extended, false) => logger.format(extended_format),
        (LogFormat::Text, true) => logger.format(text_color_format),
        (LogFormat::Text, false) => logger.format(text_format),
    };

    if let Some(file_path) = log_file {
        let file_spec = FileSpec::try_from(std::path::Path::new(file_path))?;
        logger = logger.log_to_file(file_spec);
    }

    let handle = logger.start()?;
    let _ = LOGGER_HANDLE.set(Mutex::new(handle));

    Ok(())
}

fn level_abbr(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERR",
        log::Level::Warn => "WRN",
        log::Level::Info => "INF",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRC",
    }
}

fn colored_level(level: log::Level) -> colored::ColoredString {
    use colored::Colorize;

    match level {
        log::Level::Error => level_abbr(level).red().bold(),
        log::Level::Warn => level_abbr(level).yellow(),
        log::Level::Info => level_abbr(level).green(),
        log::Level::Debug => level_abbr(level).blue(),
        log::Level::Trace => level_abbr(level).magenta(),
    }
}

fn text_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_abbr(record.level()),
        record.args()
    )
}

fn text_color_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    use colored::Colorize;

    write!(
        w,
        "{} {} {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
        colored_level(record.level()),
        record.args()
    )
}

fn extended_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {} {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_abbr(record.level()),
        record.args(),
        format_target_as_path(record.target(), record.line())
    )
}

fn extended_color_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    use colored::Colorize;

    write!(
        w,
        "{} {} {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
        colored_level(record.level()),
        record.args(),
        format_target_as_path(record.target(), record.line()).dimmed()
    )
}

fn json_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    let json_obj = serde_json::json!({
        "timestamp": now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        "level": level_abbr(record.level()),
        "message": record.args().to_string(),
        "target": format_target_as_path(record.target(), record.line()),
    });

    match serde_json::to_string(&json_obj) {
        Ok(line) => w.write_all(line.as_bytes()),
        Err(_) => w.write_all(b"{\"error\":\"Failed to serialize log message\"}"),
    }
}

/// `bufferqueue::queue::producer` with line 42 becomes `queue/producer.rs:42`
fn format_target_as_path(target: &str, line: Option<u32>) -> String {
    let path_like = match target.strip_prefix("bufferqueue::") {
        Some(module_path) => module_path.replace("::", "/") + ".rs",
        None => target.replace("::", "/"),
    };

    match line {
        Some(line_num) => format!("{}:{}", path_like, line_num),
        None => path_like,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(
        format: fn(&mut dyn std::io::Write, &mut DeferredNow, &log::Record) -> std::io::Result<()>,
        record: &log::Record,
    ) -> String {
        let mut buffer = Vec::new();
        let mut now = DeferredNow::new();
        format(&mut buffer, &mut now, record).unwrap();
        String::from_utf8(buffer).expect("Output should be valid UTF-8")
    }

    #[test]
    fn test_format_target_as_path() {
        assert_eq!(
            format_target_as_path("bufferqueue::queue::producer", Some(42)),
            "queue/producer.rs:42"
        );
        assert_eq!(format_target_as_path("tokio::runtime", None), "tokio/runtime");
    }

    #[test]
    fn test_log_format_from_name() {
        assert_eq!(LogFormat::from_name(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_name(Some("ext")), LogFormat::Extended);
        assert_eq!(LogFormat::from_name(Some("bogus")), LogFormat::Text);
        assert_eq!(LogFormat::from_name(None), LogFormat::Text);
    }

    #[test]
    fn test_text_format_has_no_location() {
        let record = log::Record::builder()
            .level(log::Level::Info)
            .target("bufferqueue::push::host")
            .line(Some(10))
            .args(format_args!("Host started"))
            .build();

        let output = render(text_format, &record);
        assert!(output.contains("INF Host started"), "got: {}", output);
        assert!(!output.contains("push/host.rs"));
    }

    #[test]
    fn test_extended_format_includes_location() {
        let record = log::Record::builder()
            .level(log::Level::Warn)
            .target("bufferqueue::queue::topic")
            .line(Some(7))
            .args(format_args!("Group created"))
            .build();

        let output = render(extended_format, &record);
        assert!(
            output.ends_with("WRN Group created (queue/topic.rs:7)"),
            "got: {}",
            output
        );
    }

    #[test]
    fn test_json_format_is_single_object() {
        let record = log::Record::builder()
            .level(log::Level::Error)
            .target("bufferqueue::push::host")
            .args(format_args!("Handler failed"))
            .build();

        let output = render(json_format, &record);
        assert!(!output.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["level"], "ERR");
        assert_eq!(value["message"], "Handler failed");
        assert_eq!(value["target"], "push/host.rs");
    }
}
