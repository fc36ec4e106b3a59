//! Logger setup for the `novel` binary.
//!
//! The file log is `./novel.log` in the working directory and is appended to
//! across runs. `NOVEL_LOG` overrides the default info level.

use std::fs::{File, OpenOptions};
use std::path::Path;

use clap::ValueEnum;
use engine_logging::level_from_env;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILE: &str = "./novel.log";

/// Transport crates whose debug output drowns ours.
const QUIET_TARGETS: [&str; 4] = ["hyper", "reqwest", "rustls", "html5ever"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogDestination {
    /// Append to ./novel.log
    File,
    /// Write to stderr
    Terminal,
    Both,
}

impl LogDestination {
    fn terminal(self) -> bool {
        matches!(self, LogDestination::Terminal | LogDestination::Both)
    }

    fn file(self) -> bool {
        matches!(self, LogDestination::File | LogDestination::Both)
    }
}

pub fn initialize(destination: LogDestination) {
    let level = level_from_env(LevelFilter::Info);
    let config = logger_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if destination.terminal() {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if destination.file() {
        match open_log_file(Path::new(LOG_FILE)) {
            Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
            Err(err) => eprintln!("Warning: no log file at {LOG_FILE}: {err}"),
        }
    }
    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }
}

fn logger_config() -> Config {
    let mut builder = ConfigBuilder::new();
    builder
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error);
    for target in QUIET_TARGETS {
        builder.add_filter_ignore_str(target);
    }
    builder.build()
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn both_writes_everywhere() {
        assert!(LogDestination::Both.terminal() && LogDestination::Both.file());
        assert!(!LogDestination::File.terminal());
        assert!(!LogDestination::Terminal.file());
    }

    #[test]
    fn log_file_is_appended_to() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("novel.log");
        std::fs::write(&path, "earlier run\n").unwrap();

        use std::io::Write;
        writeln!(open_log_file(&path).unwrap(), "this run").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "earlier run\nthis run\n"
        );
    }
}
