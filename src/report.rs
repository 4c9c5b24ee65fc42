//! `progname: message` diagnostics; warnings return, fatal errors exit.

use crate::error::Error;
use env_logger::{Builder, Env};
use log::{error, warn, LevelFilter};
use std::fmt::Display;
use std::io::Write;
use std::process;
#[cfg(test)]
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct Reporter {
    progname: String,
    #[cfg(test)]
    captured: Option<Arc<Mutex<Vec<String>>>>,
}

/// Logger for the tools. `RUST_LOG` tunes everything except this module,
/// whose warnings and fatal errors are always printed.
fn logger_builder(env: Env) -> Builder {
    let mut builder = Builder::from_env(env);
    builder
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .filter_module(module_path!(), LevelFilter::Warn);
    builder
}

impl Reporter {
    pub fn new(progname: impl Into<String>) -> Self {
        Reporter {
            progname: progname.into(),
            #[cfg(test)]
            captured: None,
        }
    }

    /// Creates the reporter and installs the process-wide logger.
    pub fn init(progname: impl Into<String>) -> Self {
        logger_builder(Env::default().default_filter_or("info")).init();
        Self::new(progname)
    }

    #[cfg(test)]
    pub(crate) fn capturing(progname: impl Into<String>) -> Self {
        Reporter {
            captured: Some(Arc::default()),
            ..Self::new(progname)
        }
    }

    #[cfg(test)]
    pub(crate) fn warnings(&self) -> Vec<String> {
        self.captured
            .as_ref()
            .map(|c| c.lock().unwrap().clone())
            .unwrap_or_default()
    }

    pub fn line(&self, msg: impl Display) -> String {
        format!("{}: {}", self.progname, msg)
    }

    pub fn warning(&self, msg: impl Display) {
        let line = self.line(msg);
        #[cfg(test)]
        {
            if let Some(captured) = &self.captured {
                captured.lock().unwrap().push(line.clone());
            }
        }
        warn!("{}", line);
    }

    pub fn fatal(&self, err: &Error) -> ! {
        error!("{}", self.line(err));
        process::exit(err.exit_code())
    }

    /// Unwraps `result`, or terminates through [`Reporter::fatal`].
    pub fn or_exit<T>(&self, result: crate::Result<T>) -> T {
        match result {
            Ok(v) => v,
            Err(err) => self.fatal(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Record};
    use nix::errno::Errno;

    #[test]
    fn test_line_shape() {
        let reporter = Reporter::new("slices-in-pagecache");
        let err = Error::nix("Unable to map 'f'", Errno::ENODEV);
        assert_eq!(
            reporter.line(&err),
            format!(
                "slices-in-pagecache: Unable to map 'f': {} ({})",
                Errno::ENODEV.desc(),
                Errno::ENODEV as i32
            )
        );
        assert_eq!(
            reporter.line("Filename required"),
            "slices-in-pagecache: Filename required"
        );
    }

    #[test]
    fn test_diagnostics_survive_log_off() {
        // The variable is unset, so the "off" fallback applies.
        let env = Env::new().filter_or("PAGECACHE_TOOLS_UNSET_LOG_VAR", "off");
        let logger = logger_builder(env).build();

        assert!(enabled(&logger, Level::Error, "pagecache_tools::report"));
        assert!(enabled(&logger, Level::Warn, "pagecache_tools::report"));
        assert!(!enabled(&logger, Level::Info, "pagecache_tools::report"));
        assert!(!enabled(&logger, Level::Error, "pagecache_tools::random_io"));
    }

    fn enabled(logger: &env_logger::Logger, level: Level, target: &str) -> bool {
        logger.matches(&Record::builder().level(level).target(target).build())
    }

    #[test]
    fn test_capturing_warnings() {
        let reporter = Reporter::capturing("hrr");
        reporter.warning("Problem closing 'f'");
        assert_eq!(reporter.warnings(), vec!["hrr: Problem closing 'f'".to_string()]);
        assert!(Reporter::new("hrr").warnings().is_empty());
    }
}
