//! Command-line arguments for the `bufferqueue` runner

use crate::core::validation::validate_positive_int;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of items produced per topic
pub const DEFAULT_ITEMS: usize = 10_000;

/// Default seconds to wait for consumers to drain
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Global arguments
//
// Every option can also be omitted; the TOML file only describes topics and
// consumers, runtime knobs come from here.
#[derive(Parser, Debug, Clone)]
#[command(name = "bufferqueue")]
#[command(about = "Run producers and push consumers over a partitioned in-process buffer queue")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Force coloured output
    #[arg(short = 'g', long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Items to produce on every topic
    #[arg(short = 'n', long = "items", value_name = "COUNT", value_parser = validate_positive_int, default_value_t = DEFAULT_ITEMS)]
    pub items: usize,

    /// Seconds to wait for consumers to catch up (minimum: 1)
    #[arg(short = 't', long = "timeout-secs", value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

impl Args {
    /// Colour when forced, otherwise when stdout is a terminal
    pub fn use_color(&self) -> bool {
        if self.no_color {
            return false;
        }
        self.color || std::io::stdout().is_terminal()
    }

    /// Log file, with the magic values "none" and "-" meaning no file
    pub fn log_file(&self) -> Option<&str> {
        let file = self.log_file.as_deref()?.to_str()?;
        if file.eq_ignore_ascii_case("none") || file == "-" {
            None
        } else {
            Some(file)
        }
    }

    /// Drain timeout as a Duration (enforces a minimum of one second)
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
