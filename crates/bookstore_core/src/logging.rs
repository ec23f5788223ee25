//! Process-wide logging setup.
//!
//! # Responsibility
//! - Start the `flexi_logger` backend behind the `log` facade once.
//! - Route records to size-rotated files or to stderr.
//! - Capture panics as single-line error records.
//!
//! # Invariants
//! - A second `init_logging` call with equal settings is a no-op.
//! - A second call with different settings fails and leaves logging untouched.
//! - Nothing in this module panics.

use flexi_logger::{
    detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming,
    WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const FILE_BASENAME: &str = "bookstore";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(LoggingError::InvalidLevel(value.to_string())),
        }
    }
}

/// Destination for log records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Absolute directory holding `bookstore*.log` files.
    Directory(PathBuf),
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => f.write_str("stderr"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub target: LogTarget,
}

impl Display for LogSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "level={} target={}", self.level, self.target)
    }
}

impl LogSettings {
    /// Parses `level` and resolves a relative `log_dir` against the working
    /// directory.
    pub fn resolve(level: &str, log_dir: Option<&Path>) -> Result<Self, LoggingError> {
        let level = level.parse()?;
        let target = match log_dir {
            None => LogTarget::Stderr,
            Some(dir) if dir.as_os_str().is_empty() => {
                return Err(LoggingError::InvalidDirectory {
                    path: PathBuf::new(),
                    reason: "path is empty".to_string(),
                })
            }
            Some(dir) if dir.is_absolute() => LogTarget::Directory(dir.to_path_buf()),
            Some(dir) => {
                let cwd = std::env::current_dir().map_err(|err| LoggingError::InvalidDirectory {
                    path: dir.to_path_buf(),
                    reason: err.to_string(),
                })?;
                LogTarget::Directory(cwd.join(dir))
            }
        };
        Ok(Self { level, target })
    }
}

#[derive(Debug)]
pub enum LoggingError {
    InvalidLevel(String),
    InvalidDirectory { path: PathBuf, reason: String },
    /// Logging already runs with other settings.
    Conflict { active: LogSettings, requested: LogSettings },
    Backend(String),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::InvalidDirectory { path, reason } => {
                write!(f, "unusable log directory `{}`: {reason}", path.display())
            }
            Self::Conflict { active, requested } => write!(
                f,
                "logging already initialized with {active}; refusing to switch to {requested}"
            ),
            Self::Backend(message) => write!(f, "failed to start logger: {message}"),
        }
    }
}

impl Error for LoggingError {}

/// Starts process logging, or confirms it already runs with these settings.
///
/// With `log_dir` set, records go to files rotated at 10 MiB (five kept) and
/// errors are echoed to stderr.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<(), LoggingError> {
    let requested = LogSettings::resolve(level, log_dir)?;
    let active = ACTIVE.get_or_try_init(|| start(requested.clone()))?;
    if active.settings != requested {
        return Err(LoggingError::Conflict {
            active: active.settings.clone(),
            requested,
        });
    }
    Ok(())
}

/// Settings of the running logger, if any.
pub fn logging_status() -> Option<LogSettings> {
    ACTIVE.get().map(|active| active.settings.clone())
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> LogLevel {
    if cfg!(debug_assertions) {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

fn start(settings: LogSettings) -> Result<ActiveLogger, LoggingError> {
    let logger = Logger::try_with_str(settings.level.as_str())
        .map_err(|err| LoggingError::Backend(err.to_string()))?;
    let logger = match &settings.target {
        LogTarget::Stderr => logger.log_to_stderr().format_for_stderr(detailed_format),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| LoggingError::InvalidDirectory {
                path: dir.clone(),
                reason: err.to_string(),
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .duplicate_to_stderr(Duplicate::Error)
                .format_for_files(detailed_format)
        }
    };
    let handle = logger
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_logger();
    info!(
        "event=logging_init module=core status=ok {settings} os={} version={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    );
    Ok(ActiveLogger {
        settings,
        _handle: handle,
    })
}

fn install_panic_logger() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let location = panic
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = panic
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=core status=error location={location} payload={}",
            one_line(&payload, PANIC_SUMMARY_CHARS)
        );
        previous(panic);
    }));
}

/// Flattens line breaks and truncates to `max_chars`, marking the cut with `...`.
fn one_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, one_line, LogLevel, LogSettings, LogTarget, LoggingError};
    use std::path::Path;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(" WARNING ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("Info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert!(matches!(
            "verbose".parse::<LogLevel>(),
            Err(LoggingError::InvalidLevel(_))
        ));
    }

    #[test]
    fn relative_directories_become_absolute() {
        let settings = LogSettings::resolve("info", Some(Path::new("logs"))).unwrap();
        match settings.target {
            LogTarget::Directory(dir) => {
                assert!(dir.is_absolute());
                assert!(dir.ends_with("logs"));
            }
            LogTarget::Stderr => panic!("expected a directory target"),
        }
        assert!(LogSettings::resolve("info", Some(Path::new(""))).is_err());
        assert_eq!(
            LogSettings::resolve("debug", None).unwrap().target,
            LogTarget::Stderr
        );
    }

    #[test]
    fn one_line_flattens_and_truncates() {
        assert_eq!(one_line("a\nb", 10), "a b");
        assert_eq!(one_line("line1\nline2", 4), "line...");
    }

    #[test]
    fn second_init_must_match_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();

        init_logging("info", Some(dir.path())).unwrap();
        init_logging("INFO", Some(dir.path())).unwrap();

        for (level, target) in [
            ("debug", Some(dir.path())),
            ("info", Some(other.path())),
            ("info", None),
        ] {
            let err = init_logging(level, target).unwrap_err();
            assert!(matches!(err, LoggingError::Conflict { .. }));
            assert!(err.to_string().contains("refusing to switch"));
        }

        let active = logging_status().unwrap();
        assert_eq!(active.level, LogLevel::Info);
        assert_eq!(active.target, LogTarget::Directory(dir.path().to_path_buf()));
    }
}
