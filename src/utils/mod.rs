//! Utilities: stderr logging with a process-wide level picked from -v / -q.
//!
//! Lines look like `[DEBUG +0.042s rpc] logged in to ...`: level, time since
//! `init_logging`, and an optional target naming the layer that logged.
//! Nothing is formatted when the level is filtered out.
//!
//!   log_error!("{e}")
//!   log_debug!(target: "rpc", "dialing {}", url)

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

pub mod logging {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
    pub enum LogLevel {
        Error = 0,
        Info = 1,
        Debug = 2,
        Trace = 3,
    }

    impl LogLevel {
        pub fn as_str(&self) -> &'static str {
            match self {
                LogLevel::Error => "ERROR",
                LogLevel::Info => "INFO",
                LogLevel::Debug => "DEBUG",
                LogLevel::Trace => "TRACE",
            }
        }

        fn from_u8(raw: u8) -> Self {
            match raw {
                0 => LogLevel::Error,
                1 => LogLevel::Info,
                2 => LogLevel::Debug,
                _ => LogLevel::Trace,
            }
        }
    }

    static LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
    static STARTED: OnceLock<Instant> = OnceLock::new();

    pub fn init_logging(level: LogLevel) {
        STARTED.get_or_init(Instant::now);
        LEVEL.store(level as u8, Ordering::Relaxed);
    }

    pub fn current_log_level() -> LogLevel {
        LogLevel::from_u8(LEVEL.load(Ordering::Relaxed))
    }

    /// `-q` wins; otherwise each `-v` opens one more level.
    pub fn derive_level(verbose: u8, quiet: bool) -> LogLevel {
        if quiet {
            return LogLevel::Error;
        }
        LogLevel::from_u8(verbose.saturating_add(1))
    }

    pub fn enabled(level: LogLevel) -> bool {
        level <= current_log_level()
    }

    pub fn format_line(
        level: LogLevel,
        elapsed_secs: f64,
        target: &str,
        args: fmt::Arguments<'_>,
    ) -> String {
        if target.is_empty() {
            format!("[{} +{elapsed_secs:.3}s] {args}", level.as_str())
        } else {
            format!("[{} +{elapsed_secs:.3}s {target}] {args}", level.as_str())
        }
    }

    pub fn emit(level: LogLevel, target: &str, args: fmt::Arguments<'_>) {
        let elapsed = STARTED.get_or_init(Instant::now).elapsed().as_secs_f64();
        eprintln!("{}", format_line(level, elapsed, target, args));
    }

    #[doc(hidden)]
    #[macro_export]
    macro_rules! __log_at {
        ($level:ident, target: $target:expr, $($t:tt)*) => {
            if $crate::utils::logging::enabled($crate::utils::logging::LogLevel::$level) {
                $crate::utils::logging::emit(
                    $crate::utils::logging::LogLevel::$level,
                    $target,
                    format_args!($($t)*),
                );
            }
        };
        ($level:ident, $($t:tt)*) => {
            $crate::__log_at!($level, target: "", $($t)*)
        };
    }

    #[macro_export]
    macro_rules! log_error {
        ($($t:tt)*) => { $crate::__log_at!(Error, $($t)*) };
    }
    #[macro_export]
    macro_rules! log_info {
        ($($t:tt)*) => { $crate::__log_at!(Info, $($t)*) };
    }
    #[macro_export]
    macro_rules! log_debug {
        ($($t:tt)*) => { $crate::__log_at!(Debug, $($t)*) };
    }
    #[macro_export]
    macro_rules! log_trace {
        ($($t:tt)*) => { $crate::__log_at!(Trace, $($t)*) };
    }
}

pub use logging::{derive_level, init_logging};
