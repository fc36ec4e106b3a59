#![deny(missing_docs)]
//! Logging shared by the novel harvester crates.
//!
//! Library code logs through the `engine_*` macros. Only binaries and tests
//! install a logger; the level can be raised or lowered with [`LOG_LEVEL_ENV`].

use log::LevelFilter;

#[doc(hidden)]
pub use log as __log;

/// Environment variable consulted by [`level_from_env`].
pub const LOG_LEVEL_ENV: &str = "NOVEL_LOG";

#[doc(hidden)]
#[macro_export]
macro_rules! __engine_log {
    ($level:ident, $($arg:tt)*) => {{
        $crate::__log::log!($crate::__log::Level::$level, $($arg)*);
    }};
}

/// Trace-level message, for per-node and per-step chatter.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => { $crate::__engine_log!(Trace, $($arg)*) };
}

/// Debug-level message.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => { $crate::__engine_log!(Debug, $($arg)*) };
}

/// Info-level message.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => { $crate::__engine_log!(Info, $($arg)*) };
}

/// Warn-level message, used for failed fetches and skipped input.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => { $crate::__engine_log!(Warn, $($arg)*) };
}

/// Error-level message.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => { $crate::__engine_log!(Error, $($arg)*) };
}

/// Level named by [`LOG_LEVEL_ENV`], or `default` when it is unset or
/// not a level name.
pub fn level_from_env(default: LevelFilter) -> LevelFilter {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|raw| parse_level(&raw))
        .unwrap_or(default)
}

fn parse_level(raw: &str) -> Option<LevelFilter> {
    raw.trim().parse::<LevelFilter>().ok()
}

/// Installs a terminal logger for tests. Later calls are no-ops.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

    let fallback = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    // A logger installed by an earlier test is fine.
    let _ = TermLogger::init(
        level_from_env(fallback),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

#[cfg(test)]
mod tests {
    use super::parse_level;
    use log::LevelFilter;

    #[test]
    fn parses_known_levels_case_insensitively() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
    }

    #[test]
    fn rejects_unknown_levels() {
        assert_eq!(parse_level("chatty"), None);
    }

    #[test]
    fn macros_accept_format_arguments() {
        super::initialize_for_tests();
        let novel = 7;
        engine_trace!("trace {novel}");
        engine_debug!("debug {}", novel);
        engine_info!("info");
        engine_warn!("warn {:?}", Some(novel));
        engine_error!("error {novel:>3}");
    }
}
