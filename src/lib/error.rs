//! # Errors of the suite
//!
//! Every library function returns a `PipelineError` when it fails.
//! There are two kinds of failures in a run:
//! - fatal setup failures (missing directories, files, config keys, conda env)
//!   which abort before any work is done
//! - failing external commands, which abort the stage
//!
//! Per-file problems during a scan (unmatched mates, odd names) are never
//! errors, they are only logged.
use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum PipelineError {
    /// a command line argument without value
    MissingArgument(String),
    /// a required input directory is missing
    DirectoryNotFound(PathBuf),
    /// a required input file is missing
    FileNotFound(PathBuf),
    /// a stage found nothing to process
    NoInputFiles {
        dir: PathBuf,
        marker: String,
    },
    /// JSON config could not be parsed
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// JSON config lacks required top-level keys
    MissingConfigKeys {
        path: PathBuf,
        keys: Vec<String>,
    },
    /// JSON config has the keys but a value is unusable
    InvalidConfig {
        path: PathBuf,
        reason: String,
    },
    CondaEnvNotFound(String),
    /// tool is present but too old for what we ask from it
    ToolVersion {
        tool: String,
        found: String,
        required: String,
    },
    /// the program could not be started at all
    CommandSpawn {
        command: String,
        source: io::Error,
    },
    /// the program ran but returned a non-zero exit status
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    /// some inputs of a stage failed, or none was processed
    StageFailed {
        failed: usize,
        total: usize,
    },
    Io(io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Regex(regex::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::MissingArgument(a) => write!(f, "missing value for argument {}", a),
            PipelineError::DirectoryNotFound(p) => {
                write!(f, "directory '{}' does not exist", p.display())
            }
            PipelineError::FileNotFound(p) => write!(f, "file '{}' does not exist", p.display()),
            PipelineError::NoInputFiles { dir, marker } => write!(
                f,
                "no {} VCF files found in '{}'",
                marker,
                dir.display()
            ),
            PipelineError::ConfigParse { path, source } => write!(
                f,
                "failed to parse JSON config file '{}': {}",
                path.display(),
                source
            ),
            PipelineError::MissingConfigKeys { path, keys } => write!(
                f,
                "missing keys in config '{}': {}",
                path.display(),
                keys.join(", ")
            ),
            PipelineError::InvalidConfig { path, reason } => {
                write!(f, "invalid config '{}': {}", path.display(), reason)
            }
            PipelineError::CondaEnvNotFound(env) => {
                write!(f, "conda environment '{}' does not exist", env)
            }
            PipelineError::ToolVersion {
                tool,
                found,
                required,
            } => write!(
                f,
                "{} version {} is too old, need >= {}",
                tool, found, required
            ),
            PipelineError::CommandSpawn { command, source } => {
                write!(f, "could not start '{}': {}", command, source)
            }
            PipelineError::CommandFailed {
                command,
                code,
                stderr,
            } => {
                match code {
                    Some(c) => write!(f, "command failed with code {}: {}", c, command)?,
                    None => write!(f, "command terminated by signal: {}", command)?,
                }
                if !stderr.trim().is_empty() {
                    write!(f, "\n{}", stderr.trim())?;
                }
                Ok(())
            }
            PipelineError::StageFailed { failed, total } => {
                if *failed == 0 {
                    write!(f, "none of {} input files was processed", total)
                } else {
                    write!(f, "{} of {} input files failed", failed, total)
                }
            }
            PipelineError::Io(e) => write!(f, "I/O error: {}", e),
            PipelineError::Csv(e) => write!(f, "CSV error: {}", e),
            PipelineError::Json(e) => write!(f, "JSON error: {}", e),
            PipelineError::Regex(e) => write!(f, "invalid pattern: {}", e),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::ConfigParse { source, .. } => Some(source),
            PipelineError::CommandSpawn { source, .. } => Some(source),
            PipelineError::Io(e) => Some(e),
            PipelineError::Csv(e) => Some(e),
            PipelineError::Json(e) => Some(e),
            PipelineError::Regex(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(e: io::Error) -> Self {
        PipelineError::Io(e)
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        PipelineError::Csv(e)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Json(e)
    }
}

impl From<regex::Error> for PipelineError {
    fn from(e: regex::Error) -> Self {
        PipelineError::Regex(e)
    }
}
