//! functions + structures shared by all stages:
//! directory layout of a project, finding the VCFs a stage works on,
//! naming its outputs, bookkeeping and clean-up.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::ArgMatches;
use log::{debug, error, info, warn};

use crate::lib::error::PipelineError;

/// Information about the running program which goes into the log header
#[derive(Debug)]
pub struct VersionInfo<'a> {
    /// the used program/stage
    pub program: &'a str,
    /// the version of the program
    pub version: &'a str,
    /// the executed command
    pub command: &'a str,
}

impl<'a> VersionInfo<'a> {
    pub fn log(&self) {
        info!("Program: {} {}", self.program, self.version);
        info!("Command: {}", self.command);
    }
}

/// value of an argument clap already enforces, as error instead of panic
pub fn required_arg<'m>(matches: &'m ArgMatches<'_>, name: &str) -> Result<&'m str, PipelineError> {
    matches
        .value_of(name)
        .ok_or_else(|| PipelineError::MissingArgument(name.to_string()))
}

/// `path` relative to the current directory, without requiring it to exist
pub fn absolute_path(path: &Path) -> Result<PathBuf, PipelineError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// local time for log headers
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Where a project keeps its things:
///
/// ```text
/// <base>/<project>/output/
/// <base>/<project>/output/logs/
/// <base>/<project>/output/sarek_results/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub base_dir: PathBuf,
    pub project: String,
}

impl ProjectLayout {
    pub fn new(base_dir: &Path, project: &str) -> Self {
        ProjectLayout {
            base_dir: base_dir.to_path_buf(),
            project: project.to_string(),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join(&self.project).join("output")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.output_dir().join("logs")
    }

    /// `<program>_<project>.log` in the log directory
    pub fn log_file(&self, program: &str) -> PathBuf {
        self.log_dir()
            .join(format!("{}_{}.log", program, self.project))
    }

    pub fn sarek_results(&self) -> PathBuf {
        self.output_dir().join("sarek_results")
    }

    /// where sarek leaves the annotated joint-called VCFs
    pub fn joint_calling_dir(&self) -> PathBuf {
        self.sarek_results()
            .join("annotation")
            .join("haplotypecaller")
            .join("joint_variant_calling")
    }

    /// creates output and log directory if needed
    pub fn prepare(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}

/// `Hh Mm Ss`
///
/// ```rust
/// use sarekpipe::lib::common::format_runtime;
/// assert_eq!(format_runtime(3723.4), "1h 2m 3s");
/// ```
pub fn format_runtime(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}h {}m {}s", total / 3600, (total % 3600) / 60, total % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcfKind {
    Gz,
    Plain,
}

impl VcfKind {
    pub fn from_name(name: &str) -> Option<VcfKind> {
        if name.ends_with(".vcf.gz") {
            Some(VcfKind::Gz)
        } else if name.ends_with(".vcf") {
            Some(VcfKind::Plain)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Option<VcfKind> {
        path.file_name()
            .and_then(|n| VcfKind::from_name(&n.to_string_lossy()))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            VcfKind::Gz => ".vcf.gz",
            VcfKind::Plain => ".vcf",
        }
    }

    /// bcftools `--output-type` letter
    pub fn output_type(&self) -> &'static str {
        match self {
            VcfKind::Gz => "z",
            VcfKind::Plain => "v",
        }
    }

    /// only compressed output gets a tabix index
    pub fn indexable(&self) -> bool {
        matches!(self, VcfKind::Gz)
    }
}

/// file name without `.vcf.gz` / `.vcf`
pub fn vcf_base_name(name: &str) -> &str {
    name.strip_suffix(".vcf.gz")
        .or_else(|| name.strip_suffix(".vcf"))
        .unwrap_or(name)
}

fn is_index_file(name: &str) -> bool {
    name.ends_with(".tbi") || name.ends_with(".csi")
}

/// All files in `dir` whose name contains `<marker>.vcf`, index files excluded,
/// sorted by name. Finding nothing is an error.
pub fn collect_stage_inputs(dir: &Path, marker: &str) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::DirectoryNotFound(dir.to_path_buf()));
    }
    let needle = format!("{}.vcf", marker);
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => continue,
        };
        if name.contains(&needle) && !is_index_file(&name) {
            found.push(path);
        }
    }
    if found.is_empty() {
        let marker = if marker.is_empty() { "any" } else { marker };
        return Err(PipelineError::NoInputFiles {
            dir: dir.to_path_buf(),
            marker: marker.to_string(),
        });
    }
    found.sort();
    Ok(found)
}

/// Number of inputs which will get an output, sidecars like `.md5` are
/// not counted. This is the `n_inputs` for [`stage_output_name`].
pub fn vcf_input_count(inputs: &[PathBuf]) -> usize {
    inputs
        .iter()
        .filter(|p| VcfKind::from_path(p).is_some())
        .count()
}

/// Name of a stage output for `input`: `<stem>.vcf[.gz]` following the input
/// compression. With several VCF inputs the input base name is put in front
/// so the outputs do not overwrite each other.
/// `None` for inputs which are no VCF at all.
///
/// Unittest: TRUE
///
/// ```rust
/// use sarekpipe::lib::common::{*};
/// use std::path::Path;
///
/// let input = Path::new("/out/joint_germline.vcf.gz");
/// assert_eq!(stage_output_name(input, "s3_filter_PASS", 1).as_deref(), Some("s3_filter_PASS.vcf.gz"));
/// assert_eq!(
///     stage_output_name(input, "s3_filter_PASS", 2).as_deref(),
///     Some("joint_germline.s3_filter_PASS.vcf.gz")
/// );
/// ```
pub fn stage_output_name(input: &Path, stem: &str, n_inputs: usize) -> Option<String> {
    let name = input.file_name()?.to_string_lossy().into_owned();
    let kind = VcfKind::from_name(&name)?;
    if n_inputs > 1 {
        Some(format!("{}.{}{}", vcf_base_name(&name), stem, kind.extension()))
    } else {
        Some(format!("{}{}", stem, kind.extension()))
    }
}

/// Runs `step` for every input whose output `name_for` can name.
/// Inputs without name are skipped, failing inputs are logged and counted,
/// the remaining inputs are still processed.
pub fn process_inputs<N, F>(inputs: &[PathBuf], name_for: N, mut step: F) -> RunSummary
where
    N: Fn(&Path) -> Option<PathBuf>,
    F: FnMut(&Path, &Path) -> Result<(), PipelineError>,
{
    let mut summary = RunSummary::new(inputs.len());
    for input in inputs {
        let input_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = match name_for(input) {
            Some(o) => o,
            None => {
                warn!("Skipping unexpected file: {}", input.display());
                summary.skip();
                continue;
            }
        };
        let output_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match step(input, &output) {
            Ok(()) => {
                info!("Processed: {} -> {}", input_name, output_name);
                summary.record(true);
            }
            Err(e) => {
                error!("Failed to process: {} -> {} ({})", input_name, output_name, e);
                summary.record(false);
            }
        }
    }
    summary
}

/// Removes temporary files together with their `.csi`/`.tbi` and
/// temporary directories with their content. Failures are only warned about.
pub fn cleanup_temp_files(paths: &[PathBuf], keep_temp: bool) {
    if keep_temp {
        info!("Keeping temporary files (debug mode).");
        return;
    }
    for p in paths {
        let result = if p.is_dir() {
            fs::remove_dir_all(p).map(|_| debug!("Removed temp directory: {}", p.display()))
        } else if p.is_file() {
            fs::remove_file(p).map(|_| {
                debug!("Removed temp file: {}", p.display());
                for ext in &["csi", "tbi"] {
                    let idx = PathBuf::from(format!("{}.{}", p.display(), ext));
                    if idx.exists() && fs::remove_file(&idx).is_ok() {
                        debug!("Removed index file: {}", idx.display());
                    }
                }
            })
        } else {
            Ok(())
        };
        if let Err(e) = result {
            warn!("Could not remove {}: {}", p.display(), e);
        }
    }
}

/// Sample list for `bcftools view --samples-file`, one name per line.
/// Returns (included, excluded), names prefixed with `^` are excluded.
pub fn parse_sample_list(path: &Path) -> Result<(Vec<String>, Vec<String>), PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::FileNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.strip_prefix('^') {
            Some(name) => excluded.push(name.trim().to_string()),
            None => included.push(line.to_string()),
        }
    }
    Ok((included, excluded))
}

/// Per-file bookkeeping of a stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        RunSummary {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, ok: bool) {
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.succeeded > 0
    }

    /// `Err` unless [`RunSummary::is_success`]
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(PipelineError::StageFailed {
                failed: self.failed,
                total: self.total,
            })
        }
    }

    pub fn log(&self) {
        info!(
            "# Summary: {} succeeded, {} failed, {} skipped, {} total",
            self.succeeded, self.failed, self.skipped, self.total
        );
    }
}
