//! Logging setup shared by both binaries.
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use env_logger::{fmt, Builder, Target};
use log::{Level, LevelFilter, Record};

/// Log filter for a verbosity level.
pub fn verbosity_filter(verbosity: u64) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Error,
        1 | 2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Log as DIMACS comments to stderr, optionally appending every line to a log file.
///
/// The `BDDSAT_LOG` environment variable overrides `filter`.
pub fn init_logging(filter: LevelFilter, log_file: Option<&Path>) -> io::Result<()> {
    let tee: Option<Mutex<File>> = match log_file {
        Some(path) => Some(Mutex::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    let format = move |buf: &mut fmt::Formatter, record: &Record| {
        let line = if record.level() == Level::Info {
            format!("c {}", record.args())
        } else {
            format!("c {}: {}", record.level(), record.args())
        };
        if let Some(file) = &tee {
            if let Ok(mut file) = file.lock() {
                writeln!(file, "{}", line)?;
            }
        }
        writeln!(buf, "{}", line)
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stderr)
        .format(format)
        .filter(None, filter);

    if let Ok(ref env_var) = env::var("BDDSAT_LOG") {
        builder.parse_filters(env_var);
    }

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
    Ok(())
}

pub fn banner(name: &str) {
    log::info!("This is {} {}", name, env!("BDDSAT_VERSION"));
    log::info!(
        "  {} build - {}",
        env!("BDDSAT_PROFILE"),
        env!("BDDSAT_RUSTC_VERSION")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(verbosity_filter(0), LevelFilter::Error);
        assert_eq!(verbosity_filter(1), LevelFilter::Info);
        assert_eq!(verbosity_filter(2), LevelFilter::Info);
        assert_eq!(verbosity_filter(3), LevelFilter::Debug);
        assert_eq!(verbosity_filter(7), LevelFilter::Trace);
    }
}
