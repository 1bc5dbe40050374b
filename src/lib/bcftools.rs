//! # bcftools stages
//!
//! Builds the bcftools command lines of the VCF post-processing stages and runs
//! them through a [`CommandRunner`]. None of the VCF handling happens here,
//! bcftools does all of it.
//!
//! | stage | command(s) |
//! |-------|------------|
//! | include samples | `view --samples-file`, `index -t` |
//! | PASS filter | `view -f PASS`, `index -t` |
//! | split VEP | `+split-vep`, `annotate --remove INFO/CSQ`, `view --include CANONICAL`, `index -t` |
//! | impact filter | `view --include vep_IMPACT=...`, `index -t` |
//! | select columns | `query -f` |
//!
//! Indexing only happens for bgzipped output.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::lib::command::{CommandRunner, ToolCommand};
use crate::lib::common::VcfKind;
use crate::lib::error::PipelineError;

/// prefix of the INFO tags `+split-vep` creates
pub const ANNOT_PREFIX: &str = "vep_";

/// impact tiers kept by default
pub const DEFAULT_IMPACTS: [&str; 2] = ["MODERATE", "HIGH"];

/// `vep_IMPACT='MODERATE' || vep_IMPACT='HIGH'`
///
/// Unittest: TRUE
///
/// ```rust
/// use sarekpipe::lib::bcftools::{*};
///
/// assert_eq!(
///     impact_expression(&DEFAULT_IMPACTS),
///     "vep_IMPACT='MODERATE' || vep_IMPACT='HIGH'"
/// );
/// ```
pub fn impact_expression<S: AsRef<str>>(impacts: &[S]) -> String {
    impacts
        .iter()
        .map(|i| format!("{}IMPACT='{}'", ANNOT_PREFIX, i.as_ref()))
        .collect::<Vec<_>>()
        .join(" || ")
}

/// one output line per sample and record, fields tab separated
///
/// ```rust
/// use sarekpipe::lib::bcftools::query_format;
/// assert_eq!(query_format(&["CHROM", "POS"]), "[%CHROM\t%POS\\n]");
/// ```
pub fn query_format<S: AsRef<str>>(fields: &[S]) -> String {
    let body = fields
        .iter()
        .map(|f| format!("%{}", f.as_ref()))
        .collect::<Vec<_>>()
        .join("\t");
    format!("[{}\\n]", body)
}

/// Content for `--samples-file` and whether it is an exclusion list.
/// Listed names are kept, minus the ones also marked with `^`. A list made
/// only of `^` names excludes those and keeps everybody else.
pub fn samples_file_content(included: &[String], excluded: &[String]) -> (String, bool) {
    let (names, exclude): (Vec<&String>, bool) = if included.is_empty() {
        (excluded.iter().collect(), true)
    } else {
        (included.iter().filter(|n| !excluded.contains(*n)).collect(), false)
    };
    let mut content = String::new();
    for n in names {
        content.push_str(n);
        content.push('\n');
    }
    (content, exclude)
}

fn output_kind(output: &Path) -> VcfKind {
    VcfKind::from_path(output).unwrap_or(VcfKind::Gz)
}

/// The two intermediate files of the split-vep stage inside `tmp_dir`
pub fn split_vep_temp_paths(tmp_dir: &Path) -> (PathBuf, PathBuf) {
    (
        tmp_dir.join("splitvep_firstsplit.vcf.gz"),
        tmp_dir.join("splitvep_noCSQ.vcf.gz"),
    )
}

pub struct Bcftools<'a> {
    runner: &'a dyn CommandRunner,
    conda_env: Option<&'a str>,
}

impl<'a> Bcftools<'a> {
    pub fn new(runner: &'a dyn CommandRunner, conda_env: Option<&'a str>) -> Self {
        Bcftools { runner, conda_env }
    }

    fn base(&self) -> ToolCommand {
        ToolCommand::tool("bcftools", self.conda_env)
    }

    pub fn index_cmd(&self, vcf: &Path) -> ToolCommand {
        self.base().args(["index", "-t"]).path_arg(vcf)
    }

    /// `samples` is the `--samples-file` value, a leading `^` excludes
    pub fn include_samples_cmd(&self, input: &Path, samples: &str, output: &Path) -> ToolCommand {
        self.base()
            .args(["view", "--samples-file", samples])
            .path_arg(input)
            .arg(format!("-O{}", output_kind(output).output_type()))
            .arg("-o")
            .path_arg(output)
    }

    pub fn pass_filter_cmd(&self, input: &Path, output: &Path) -> ToolCommand {
        self.base()
            .args(["view", "-f", "PASS"])
            .path_arg(input)
            .arg(format!("-O{}", output_kind(output).output_type()))
            .arg("-o")
            .path_arg(output)
    }

    pub fn split_vep_cmd(&self, input: &Path, columns: &str, output: &Path) -> ToolCommand {
        self.base()
            .arg("+split-vep")
            .path_arg(input)
            .args(["--duplicate", "--columns", columns, "--annot-prefix", ANNOT_PREFIX])
            .arg("--output")
            .path_arg(output)
            .args(["--output-type", "z"])
    }

    pub fn remove_csq_cmd(&self, input: &Path, output: &Path) -> ToolCommand {
        self.base()
            .args(["annotate", "--remove", "INFO/CSQ", "-Oz", "-o"])
            .path_arg(output)
            .path_arg(input)
    }

    pub fn canonical_cmd(&self, input: &Path, output: &Path) -> ToolCommand {
        self.base()
            .args(["view", "--include"])
            .arg(format!("{}CANONICAL='YES'", ANNOT_PREFIX))
            .arg(format!("-O{}", output_kind(output).output_type()))
            .arg("-o")
            .path_arg(output)
            .path_arg(input)
    }

    pub fn impact_cmd<S: AsRef<str>>(&self, input: &Path, output: &Path, impacts: &[S]) -> ToolCommand {
        self.base()
            .arg("view")
            .path_arg(input)
            .arg("--include")
            .arg(impact_expression(impacts))
            .arg("--output")
            .path_arg(output)
            .args(["--output-type", output_kind(output).output_type()])
    }

    pub fn query_cmd<S: AsRef<str>>(&self, input: &Path, fields: &[S], output: &Path) -> ToolCommand {
        self.base()
            .args(["query", "-f"])
            .arg(query_format(fields))
            .path_arg(input)
            .stdout_to(output)
    }

    fn run(&self, cmd: ToolCommand) -> Result<(), PipelineError> {
        self.runner.run(&cmd).map(|_| ())
    }

    fn index_if_compressed(&self, output: &Path) -> Result<(), PipelineError> {
        if output_kind(output).indexable() {
            self.run(self.index_cmd(output))
        } else {
            debug!("Not indexing uncompressed {}", output.display());
            Ok(())
        }
    }

    /// Keeps the `included` samples, or drops the `excluded` ones if nothing
    /// is included. The names go through a temporary samples file which is
    /// removed afterwards.
    pub fn include_samples(
        &self,
        input: &Path,
        included: &[String],
        excluded: &[String],
        output: &Path,
    ) -> Result<(), PipelineError> {
        let (content, exclude) = samples_file_content(included, excluded);
        let mut samples = NamedTempFile::new()?;
        samples.write_all(content.as_bytes())?;
        samples.flush()?;
        let samples_arg = if exclude {
            format!("^{}", samples.path().display())
        } else {
            samples.path().display().to_string()
        };
        self.run(self.include_samples_cmd(input, &samples_arg, output))?;
        self.index_if_compressed(output)
    }

    /// keeps only records with FILTER == PASS
    pub fn filter_pass(&self, input: &Path, output: &Path) -> Result<(), PipelineError> {
        self.run(self.pass_filter_cmd(input, output))?;
        self.index_if_compressed(output)
    }

    /// Splits the VEP CSQ field into `vep_*` tags, drops CSQ and keeps the
    /// canonical transcript only. The two intermediate files land in
    /// `tmp_dir`, cleaning them up is left to the caller.
    ///
    /// `--duplicate` writes one line per consequence, the intermediates can
    /// get much larger than the input.
    pub fn split_vep(&self, input: &Path, output: &Path, columns: &str, tmp_dir: &Path) -> Result<(), PipelineError> {
        fs::create_dir_all(tmp_dir)?;
        let (first_split, no_csq) = split_vep_temp_paths(tmp_dir);
        self.run(self.split_vep_cmd(input, columns, &first_split))?;
        self.run(self.remove_csq_cmd(&first_split, &no_csq))?;
        self.run(self.canonical_cmd(&no_csq, output))?;
        self.index_if_compressed(output)
    }

    pub fn filter_impact<S: AsRef<str>>(&self, input: &Path, output: &Path, impacts: &[S]) -> Result<(), PipelineError> {
        self.run(self.impact_cmd(input, output, impacts))?;
        self.index_if_compressed(output)
    }

    /// Writes a header line with the field names, then appends what
    /// `bcftools query` prints. An existing file is replaced.
    pub fn select_columns<S: AsRef<str>>(&self, input: &Path, output: &Path, fields: &[S]) -> Result<(), PipelineError> {
        let header = fields.iter().map(|f| f.as_ref()).collect::<Vec<_>>().join("\t");
        fs::write(output, format!("{}\n", header))?;
        self.run(self.query_cmd(input, fields, output))
    }
}
