//! # External commands
//!
//! All calls to `conda`, `bcftools` and `nextflow` go through here.
//! A stage builds a [`ToolCommand`], hands it to a [`CommandRunner`] and gets
//! back either the captured output or a `PipelineError`. Nothing else in the
//! crate looks at exit codes.
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::lib::error::PipelineError;

static BCFTOOLS_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"bcftools (\d+(\.\d+)+)").expect("static bcftools version pattern"));

/// Minimum bcftools version which ships the `+split-vep` plugin
pub const SPLIT_VEP_MIN_VERSION: &str = "1.10";

/// One invocation of an external program.
/// Built with the small builder methods below, e.g.
///
/// ```rust
/// use sarekpipe::lib::command::ToolCommand;
/// let cmd = ToolCommand::tool("bcftools", Some("env_bcftools"))
///     .args(["index", "-t", "out.vcf.gz"]);
/// assert_eq!(cmd.command_line(), "conda run -n env_bcftools bcftools index -t out.vcf.gz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// extra environment for the child only
    pub envs: Vec<(String, String)>,
    /// if set, stdout is appended to this file instead of captured
    pub stdout_path: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        ToolCommand {
            program: program.to_string(),
            args: Vec::new(),
            envs: Vec::new(),
            stdout_path: None,
        }
    }

    /// the program either from `PATH` or wrapped into `conda run -n <env>`
    pub fn tool(program: &str, conda_env: Option<&str>) -> Self {
        match conda_env {
            Some(env) => ToolCommand::new("conda").args(["run", "-n", env, program]),
            None => ToolCommand::new(program),
        }
    }

    pub fn arg<S: AsRef<str>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        let p = path.to_string_lossy().into_owned();
        self.arg(p)
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn stdout_to(mut self, path: &Path) -> Self {
        self.stdout_path = Some(path.to_path_buf());
        self
    }

    /// the command as it would be typed, used for logging and errors
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.as_str());
        parts.extend(self.args.iter().map(|a| a.as_str()));
        parts.join(" ")
    }
}

/// What a successful command left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Executes a command, blocking until it finished.
/// A non-zero exit status is an error, everything else is `Ok`.
pub trait CommandRunner {
    fn run(&self, cmd: &ToolCommand) -> Result<CommandOutput, PipelineError>;
}

/// The real thing, backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ToolCommand) -> Result<CommandOutput, PipelineError> {
        let line = cmd.command_line();
        info!("Running command: {}", line);

        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args).stdin(Stdio::null()).stderr(Stdio::piped());
        for (key, value) in &cmd.envs {
            command.env(key, value);
        }
        match &cmd.stdout_path {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                command.stdout(Stdio::from(file));
            }
            None => {
                command.stdout(Stdio::piped());
            }
        }

        let output = command.output().map_err(|e| PipelineError::CommandSpawn {
            command: line.clone(),
            source: e,
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            if !stdout.trim().is_empty() {
                info!("{}", stdout.trim());
            }
            if !stderr.trim().is_empty() {
                warn!("{}", stderr.trim());
            }
            Ok(CommandOutput {
                code: output.status.code(),
                stdout,
                stderr,
            })
        } else {
            error!(
                "Command failed with code {}: {}",
                output
                    .status
                    .code()
                    .map_or_else(|| String::from("none"), |c| c.to_string()),
                line
            );
            if !stdout.trim().is_empty() {
                error!("{}", stdout.trim());
            }
            if !stderr.trim().is_empty() {
                error!("{}", stderr.trim());
            }
            Err(PipelineError::CommandFailed {
                command: line,
                code: output.status.code(),
                stderr,
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct CondaEnvList {
    #[serde(default)]
    envs: Vec<PathBuf>,
}

/// `conda env list --json` returns full prefixes, we only need the names
pub fn parse_conda_env_list(json: &str) -> Result<Vec<String>, PipelineError> {
    let list: CondaEnvList = serde_json::from_str(json)?;
    Ok(list
        .envs
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect())
}

/// Names of all conda environments.
/// If conda is missing or talks nonsense we get an empty list and a warning.
pub fn list_conda_envs(runner: &dyn CommandRunner) -> Vec<String> {
    let cmd = ToolCommand::new("conda").args(["env", "list", "--json"]);
    match runner
        .run(&cmd)
        .and_then(|out| parse_conda_env_list(&out.stdout))
    {
        Ok(envs) => envs,
        Err(e) => {
            warn!("Could not list conda environments ({})", e);
            Vec::new()
        }
    }
}

pub fn check_conda_env(runner: &dyn CommandRunner, env_name: &str) -> bool {
    list_conda_envs(runner).iter().any(|e| e == env_name)
}

/// Fails if a conda env was requested but does not exist.
/// No env requested means tools come from `PATH`.
pub fn require_conda_env(
    runner: &dyn CommandRunner,
    conda_env: Option<&str>,
) -> Result<(), PipelineError> {
    match conda_env {
        Some(env) if !check_conda_env(runner, env) => {
            Err(PipelineError::CondaEnvNotFound(env.to_string()))
        }
        _ => Ok(()),
    }
}

/// extracts e.g. `1.17` from the first line of `bcftools --version`
pub fn parse_bcftools_version(text: &str) -> Option<String> {
    BCFTOOLS_VERSION
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// bcftools version as reported by the tool, `"unknown"` if it cannot be determined
pub fn bcftools_version(runner: &dyn CommandRunner, conda_env: Option<&str>) -> String {
    let cmd = ToolCommand::tool("bcftools", conda_env).arg("--version");
    match runner.run(&cmd) {
        Ok(out) => parse_bcftools_version(&out.stdout).unwrap_or_else(|| String::from("unknown")),
        Err(_) => String::from("unknown"),
    }
}

fn version_tuple(version: &str) -> Vec<u32> {
    version
        .split('.')
        .map_while(|part| part.parse::<u32>().ok())
        .collect()
}

/// Compares dotted versions numerically, `1.9 < 1.10`.
/// An unknown version is let through with a warning, the tool itself will
/// complain soon enough.
pub fn check_min_version(tool: &str, found: &str, min: &str) -> Result<(), PipelineError> {
    if found == "unknown" {
        warn!("Could not determine {} version, assuming >= {}", tool, min);
        return Ok(());
    }
    if version_tuple(found) < version_tuple(min) {
        return Err(PipelineError::ToolVersion {
            tool: tool.to_string(),
            found: found.to_string(),
            required: min.to_string(),
        });
    }
    Ok(())
}

/// A runner which does not run anything but remembers what it was asked.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;

    #[derive(Default)]
    pub struct RecordingRunner {
        pub calls: RefCell<Vec<ToolCommand>>,
        /// any command whose line contains this fails
        pub fail_on: Option<String>,
        /// canned stdout for every call
        pub stdout: String,
    }

    impl RecordingRunner {
        pub fn failing_on(pattern: &str) -> Self {
            RecordingRunner {
                fail_on: Some(pattern.to_string()),
                ..Default::default()
            }
        }

        pub fn with_stdout(stdout: &str) -> Self {
            RecordingRunner {
                stdout: stdout.to_string(),
                ..Default::default()
            }
        }

        pub fn lines(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c.command_line()).collect()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, cmd: &ToolCommand) -> Result<CommandOutput, PipelineError> {
            self.calls.borrow_mut().push(cmd.clone());
            let line = cmd.command_line();
            if let Some(pattern) = &self.fail_on {
                if line.contains(pattern.as_str()) {
                    return Err(PipelineError::CommandFailed {
                        command: line,
                        code: Some(1),
                        stderr: String::from("mock failure"),
                    });
                }
            }
            if let Some(path) = &cmd.stdout_path {
                let mut f = OpenOptions::new().create(true).append(true).open(path)?;
                f.write_all(self.stdout.as_bytes())?;
                return Ok(CommandOutput::default());
            }
            Ok(CommandOutput {
                code: Some(0),
                stdout: self.stdout.clone(),
                stderr: String::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingRunner;
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn tool_without_env_runs_from_path() {
        let cmd = ToolCommand::tool("bcftools", None).args(["view", "-f", "PASS"]);
        assert_eq!(cmd.program, "bcftools");
        assert_eq!(cmd.command_line(), "bcftools view -f PASS");
    }

    #[test]
    fn tool_with_env_goes_through_conda() {
        let cmd = ToolCommand::tool("nextflow", Some("env_nf")).arg("run");
        assert_eq!(cmd.program, "conda");
        assert_eq!(cmd.args, vec!["run", "-n", "env_nf", "nextflow", "run"]);
    }

    #[test]
    fn system_runner_captures_streams() {
        let cmd = ToolCommand::new("sh").args(["-c", "echo hello; echo oops 1>&2"]);
        let out = SystemRunner.run(&cmd).unwrap();
        assert_eq!(out.code, Some(0));
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[test]
    fn system_runner_reports_exit_code() {
        let cmd = ToolCommand::new("sh").args(["-c", "echo broken 1>&2; exit 3"]);
        match SystemRunner.run(&cmd) {
            Err(PipelineError::CommandFailed { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "broken");
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn system_runner_reports_missing_program() {
        let cmd = ToolCommand::new("this-program-does-not-exist-anywhere");
        assert!(matches!(
            SystemRunner.run(&cmd),
            Err(PipelineError::CommandSpawn { .. })
        ));
    }

    #[test]
    fn system_runner_appends_stdout_to_file() {
        let tmp = NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "header\n").unwrap();
        let cmd = ToolCommand::new("sh")
            .args(["-c", "echo row"])
            .stdout_to(tmp.path());
        SystemRunner.run(&cmd).unwrap();
        assert_eq!(fs::read_to_string(tmp.path()).unwrap(), "header\nrow\n");
    }

    #[test]
    fn system_runner_passes_child_env() {
        let cmd = ToolCommand::new("sh")
            .args(["-c", "echo $SAREKPIPE_TEST_VAR"])
            .env("SAREKPIPE_TEST_VAR", "set-for-child");
        let out = SystemRunner.run(&cmd).unwrap();
        assert_eq!(out.stdout.trim(), "set-for-child");
    }

    #[test]
    fn conda_env_names_are_basenames() {
        let json = r#"{"envs": ["/opt/conda", "/opt/conda/envs/env_bcftools", "/home/u/.conda/envs/env_nf"]}"#;
        let envs = parse_conda_env_list(json).unwrap();
        assert_eq!(envs, vec!["conda", "env_bcftools", "env_nf"]);
    }

    #[test]
    fn conda_env_lookup() {
        let runner = RecordingRunner::with_stdout(r#"{"envs": ["/opt/conda/envs/env_nf"]}"#);
        assert!(check_conda_env(&runner, "env_nf"));
        assert!(!check_conda_env(&runner, "env_bcftools"));
        assert!(require_conda_env(&runner, None).is_ok());
        assert!(matches!(
            require_conda_env(&runner, Some("env_bcftools")),
            Err(PipelineError::CondaEnvNotFound(_))
        ));
    }

    #[test]
    fn broken_conda_output_is_empty_list() {
        let runner = RecordingRunner::with_stdout("not json");
        assert!(list_conda_envs(&runner).is_empty());
    }

    #[test]
    fn bcftools_version_parsing() {
        let text = "bcftools 1.17\nUsing htslib 1.17\nCopyright (C) 2023";
        assert_eq!(parse_bcftools_version(text), Some(String::from("1.17")));
        assert_eq!(parse_bcftools_version("bcftools dev"), None);

        let runner = RecordingRunner::with_stdout(text);
        assert_eq!(bcftools_version(&runner, Some("env_bcftools")), "1.17");
        assert_eq!(
            runner.lines(),
            vec!["conda run -n env_bcftools bcftools --version"]
        );
    }

    #[test]
    fn min_version_is_numeric() {
        assert!(check_min_version("bcftools", "1.10", SPLIT_VEP_MIN_VERSION).is_ok());
        assert!(check_min_version("bcftools", "1.17.1", SPLIT_VEP_MIN_VERSION).is_ok());
        assert!(check_min_version("bcftools", "unknown", SPLIT_VEP_MIN_VERSION).is_ok());
        assert!(matches!(
            check_min_version("bcftools", "1.9", SPLIT_VEP_MIN_VERSION),
            Err(PipelineError::ToolVersion { .. })
        ));
    }
}
