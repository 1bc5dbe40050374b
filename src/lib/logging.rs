//! Logging set-up for the stage binaries.
//!
//! Each stage logs to stdout and appends the same lines to its log file
//! `<output>/logs/<program>_<project>.log`. The level comes from the command
//! line, `RUST_LOG` is not consulted.
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Local;
use log::LevelFilter;

use crate::lib::common::ProjectLayout;
use crate::lib::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
    /// appended to, created with its parent directories if missing
    pub log_file: Option<PathBuf>,
    pub echo_stdout: bool,
}

impl LogConfig {
    pub fn new(verbose: bool, log_file: Option<PathBuf>) -> Self {
        LogConfig {
            level: if verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
            log_file,
            echo_stdout: true,
        }
    }
}

/// writes everything to stdout and the log file
pub(crate) struct Tee {
    file: Option<File>,
    stdout: bool,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.stdout {
            io::stdout().write_all(buf)?;
        }
        if let Some(f) = self.file.as_mut() {
            f.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.stdout {
            io::stdout().flush()?;
        }
        if let Some(f) = self.file.as_mut() {
            f.flush()?;
        }
        Ok(())
    }
}

fn open_log_file(config: &LogConfig) -> Result<Option<File>, PipelineError> {
    match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let f = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(Some(f))
        }
        None => Ok(None),
    }
}

/// Installs the global logger. Can only succeed once per process.
/// Plain lines, no colours, as they also go into the log file.
pub fn init(config: &LogConfig) -> Result<(), PipelineError> {
    let tee = Tee {
        file: open_log_file(config)?,
        stdout: config.echo_stdout,
    };
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(config.level)
        .target(env_logger::Target::Pipe(Box::new(tee)));
    builder
        .try_init()
        .map_err(|e| PipelineError::Io(io::Error::new(io::ErrorKind::Other, e.to_string())))
}

/// Creates the project directories and logs to `<program>_<project>.log`.
/// Returns the log file path.
pub fn init_stage(layout: &ProjectLayout, program: &str, verbose: bool) -> Result<PathBuf, PipelineError> {
    layout.prepare()?;
    let log_file = layout.log_file(program);
    init(&LogConfig::new(verbose, Some(log_file.clone())))?;
    Ok(log_file)
}
