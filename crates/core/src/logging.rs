use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_ENV: &str = "CMTSCOPE_LOG";
pub const LOG_DIR_ENV: &str = "CMTSCOPE_LOG_DIR";
const DEFAULT_DIRECTIVES: &str = "info";

/// Filter directives and file location for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directives: String,
    pub dir: PathBuf,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// `CMTSCOPE_LOG` wins over `RUST_LOG`; blank values count as unset.
    /// Logs go to `CMTSCOPE_LOG_DIR`, else `~/.cmtscope/logs`.
    pub fn resolve(var: impl Fn(&str) -> Option<String>) -> Self {
        let set = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let directives = set(LOG_ENV)
            .or_else(|| set("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string());
        let dir = set(LOG_DIR_ENV).map(PathBuf::from).unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".cmtscope/logs")
        });
        Self { directives, dir }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.directives).unwrap_or_else(|err| {
            eprintln!("ignoring {LOG_ENV}={:?}: {err}", self.directives);
            EnvFilter::new(DEFAULT_DIRECTIVES)
        })
    }
}

/// Installs the global subscriber. `component` names the daily log file
/// (`index.log.2024-01-21`); stderr output is for interactive commands.
pub fn init_logging(component: &str, settings: &LogSettings, to_stderr: bool) -> WorkerGuard {
    let _ = std::fs::create_dir_all(&settings.dir);
    let file_appender = tracing_appender::rolling::daily(&settings.dir, component);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let registry = tracing_subscriber::registry()
        .with(settings.filter())
        .with(file_layer);

    if to_stderr {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);
        registry.with(stderr_layer).init();
    } else {
        registry.init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        LogSettings::resolve(|key| vars.get(key).cloned())
    }

    #[test]
    fn own_variables_take_precedence() {
        let s = settings(&[
            (LOG_ENV, "cmtscope_java=debug"),
            ("RUST_LOG", "warn"),
            (LOG_DIR_ENV, "/var/log/cmtscope"),
        ]);
        assert_eq!(s.directives, "cmtscope_java=debug");
        assert_eq!(s.dir, PathBuf::from("/var/log/cmtscope"));
    }

    #[test]
    fn falls_back_to_rust_log_then_info() {
        assert_eq!(settings(&[(LOG_ENV, " "), ("RUST_LOG", "warn")]).directives, "warn");
        let s = settings(&[]);
        assert_eq!(s.directives, "info");
        assert!(s.dir.ends_with(".cmtscope/logs"));
    }

    #[test]
    fn bad_directives_do_not_prevent_logging() {
        let s = settings(&[(LOG_ENV, "cmtscope=loud")]);
        assert_eq!(s.filter().to_string(), EnvFilter::new("info").to_string());
    }
}
