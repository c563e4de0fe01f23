// ============================================================================
// encq-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: Console and File Backends for the `log` Facade
//
// The core library only logs through `log` macros. This module installs the
// backend: a colored env_logger on the console, or a log4rs file appender
// when a log directory is given so log lines do not tear the progress bar.
//
// RUST_LOG still works on the console backend and wins over --verbose.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use log::LevelFilter;
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use owo_colors::OwoColorize;

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
///
/// # Example
/// ```
/// let name = format!("encq_run_{}.log", encq_cli::logging::get_timestamp());
/// assert!(name.starts_with("encq_run_"));
/// ```
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Path of the log file for a run started now.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("encq_run_{}.log", get_timestamp()))
}

/// Installs the colored console logger.
pub fn init_console(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            let level_str = match record.level() {
                log::Level::Error => "ERROR".bright_red().to_string(),
                log::Level::Warn => "WARN ".yellow().to_string(),
                log::Level::Info => "INFO ".green().to_string(),
                log::Level::Debug => "DEBUG".blue().to_string(),
                log::Level::Trace => "TRACE".magenta().to_string(),
            };
            writeln!(
                buf,
                "{} {} {}",
                buf.timestamp().to_string().white(),
                level_str,
                record.args()
            )
        })
        .init();
}

/// Sends all log output to `log_file`, creating its directory first.
pub fn setup_file_logging(log_file: &Path, log_level: LevelFilter) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}",
        )))
        .build(log_file)?;

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .build(Root::builder().appender("file").build(log_level))?;

    log4rs::init_config(config)?;
    Ok(())
}
