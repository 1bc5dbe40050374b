//! # nf-core/sarek runs
//!
//! Turns a [`SarekConfig`] into the `nextflow run nf-core/sarek ...` command
//! line and writes the small temporary nextflow config the run needs.
//! Two kinds of runs exist:
//! - `Annotate`: start at the annotation step from VCF input, VEP only
//! - `Germline`: full WES germline run from FASTQ, bwa-mem, joint calling
//!   with haplotypecaller, then VEP
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{error, info};
use tempfile::{NamedTempFile, TempPath};

use crate::lib::command::{CommandRunner, ToolCommand};
use crate::lib::config::SarekConfig;
use crate::lib::error::PipelineError;

pub const DEFAULT_REVISION: &str = "3.5.1";
pub const DEFAULT_PROFILE: &str = "singularity";
pub const DEFAULT_GENOME: &str = "GATK.GRCh38";
/// nextflow diagnostics used when the caller did not set `NXF_OPTS`
pub const DEFAULT_NXF_OPTS: &str = "-Dnextflow.trace.stack=true";

/// VEP arguments always passed before the plugins
const VEP_BASE_ARGS: [&str; 4] = ["--everything", "--total_length", "--offline", "--cache"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SarekMode {
    Annotate,
    Germline,
}

impl SarekMode {
    pub fn step(&self) -> &'static str {
        match self {
            SarekMode::Annotate => "annotate",
            SarekMode::Germline => "mapping",
        }
    }

    pub fn tools(&self) -> &'static str {
        match self {
            SarekMode::Annotate => "vep",
            SarekMode::Germline => "haplotypecaller,vep",
        }
    }
}

impl FromStr for SarekMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "annotate" => Ok(SarekMode::Annotate),
            "germline" => Ok(SarekMode::Germline),
            other => Err(format!("unknown sarek mode '{}', use annotate or germline", other)),
        }
    }
}

/// Resources written into the temporary nextflow config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextflowResources {
    pub pull_timeout: String,
    pub vep_time: String,
    pub vep_cpus: u32,
    pub vep_memory: String,
}

impl Default for NextflowResources {
    fn default() -> Self {
        NextflowResources {
            pull_timeout: String::from("60m"),
            vep_time: String::from("48h"),
            vep_cpus: 8,
            vep_memory: String::from("64 GB"),
        }
    }
}

/// Everything about a run that does not come from the JSON config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SarekRun {
    pub mode: SarekMode,
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub conda_env: Option<String>,
    pub revision: String,
    pub profile: String,
    pub genome: String,
    /// additional `-c` configs, e.g. one disabling VCFTOOLS_TSTV_COUNT
    pub extra_configs: Vec<PathBuf>,
    /// value for `NXF_OPTS` in the child environment
    pub nxf_opts: Option<String>,
    pub resources: NextflowResources,
}

impl SarekRun {
    pub fn new(mode: SarekMode, input: &Path, output_dir: &Path) -> Self {
        SarekRun {
            mode,
            input: input.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            conda_env: None,
            revision: DEFAULT_REVISION.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            genome: DEFAULT_GENOME.to_string(),
            extra_configs: Vec::new(),
            nxf_opts: Some(DEFAULT_NXF_OPTS.to_string()),
            resources: NextflowResources::default(),
        }
    }

    pub fn results_dir(&self) -> PathBuf {
        self.output_dir.join("sarek_results")
    }
}

/// `NXF_OPTS` of the caller if set, our default otherwise
pub fn resolve_nxf_opts(current: Option<String>) -> String {
    match current {
        Some(v) if !v.trim().is_empty() => v,
        _ => DEFAULT_NXF_OPTS.to_string(),
    }
}

/// `--vep_custom_args` value: the base arguments followed by one
/// `--plugin <name>,<args>` per configured plugin, in config order
pub fn vep_custom_args(config: &SarekConfig) -> String {
    let mut parts: Vec<String> = VEP_BASE_ARGS.iter().map(|s| s.to_string()).collect();
    for (name, args) in &config.vep_plugins {
        parts.push(format!("--plugin {},{}", name, args.joined()));
    }
    parts.join(" ")
}

/// Content of the temporary nextflow config.
/// The VEP resource block is only needed when VEP is the main work.
pub fn render_nextflow_config(mode: SarekMode, resources: &NextflowResources) -> String {
    let mut text = format!(
        "singularity {{\n  pullTimeout = '{}'\n}}\n",
        resources.pull_timeout
    );
    if mode == SarekMode::Annotate {
        text.push_str(&format!(
            "\nprocess {{\n  withName: 'ENSEMBLVEP_VEP' {{\n    time   = '{}'\n    cpus   = {}\n    memory = '{}'\n  }}\n}}\n",
            resources.vep_time, resources.vep_cpus, resources.vep_memory
        ));
    }
    text
}

/// Writes the nextflow config into a temporary file which is removed when
/// the returned path is dropped, unless it is kept.
pub fn write_nextflow_config(mode: SarekMode, resources: &NextflowResources) -> Result<TempPath, PipelineError> {
    let mut tmp = NamedTempFile::new()?;
    tmp.write_all(render_nextflow_config(mode, resources).as_bytes())?;
    tmp.flush()?;
    Ok(tmp.into_temp_path())
}

pub fn build_nextflow_command(run: &SarekRun, config: &SarekConfig, nextflow_config: &Path) -> ToolCommand {
    let mut cmd = ToolCommand::tool("nextflow", run.conda_env.as_deref())
        .args(["run", "nf-core/sarek", "-r", run.revision.as_str(), "-resume"])
        .args(["-profile", run.profile.as_str()])
        .arg("-c")
        .path_arg(nextflow_config);
    for extra in &run.extra_configs {
        cmd = cmd.arg("-c").path_arg(extra);
    }
    cmd = cmd
        .arg("--input")
        .path_arg(&run.input)
        .arg("--outdir")
        .path_arg(&run.results_dir())
        .args(["--genome", run.genome.as_str(), "--step", run.mode.step()]);
    if run.mode == SarekMode::Germline {
        cmd = cmd.args(["--wes", "true", "--aligner", "bwa-mem", "--joint_germline", "true"]);
    }
    cmd = cmd
        .args(["--vep_cache", config.vep_cache.as_str()])
        .args(["--tools", run.mode.tools()])
        .args(["--vep_include_fasta", "true"])
        .args(["--fasta", config.fasta.as_str()])
        .args(["--fasta_fai", config.fasta_fai.as_str()])
        .args(["--dict", config.dict.as_str()])
        .arg("--vep_custom_args")
        .arg(vep_custom_args(config))
        .args(["--vep_dbnsfp", "true"])
        .args(["--dbnsfp", config.dbnsfp.as_str()])
        .args(["--dbnsfp_tbi", config.dbnsfp_tbi.as_str()])
        .arg("--dbnsfp_fields")
        .arg(config.dbnsfp_fields.join(","));
    if let Some(opts) = &run.nxf_opts {
        cmd = cmd.env("NXF_OPTS", opts);
    }
    cmd
}

/// Runs sarek to completion. On success the temporary nextflow config is
/// removed, on failure it stays for debugging and its path is logged.
pub fn run_sarek(runner: &dyn CommandRunner, run: &SarekRun, config: &SarekConfig) -> Result<(), PipelineError> {
    let nextflow_config = write_nextflow_config(run.mode, &run.resources)?;
    info!("Temp Nextflow config  : {}", nextflow_config.display());
    let cmd = build_nextflow_command(run, config, &nextflow_config);
    match runner.run(&cmd) {
        Ok(_) => {
            nextflow_config.close()?;
            Ok(())
        }
        Err(e) => {
            error!("Nextflow command failed.");
            match nextflow_config.keep() {
                Ok(kept) => error!("Left temporary Nextflow config at: {}", kept.display()),
                Err(keep_err) => error!("Could not keep temporary Nextflow config: {}", keep_err),
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::command::testing::RecordingRunner;
    use crate::lib::config::PluginArgs;
    use indexmap::IndexMap;
    use std::fs;

    fn config() -> SarekConfig {
        let mut plugins = IndexMap::new();
        plugins.insert(
            String::from("SpliceAI"),
            PluginArgs::Many(vec![String::from("snv=/r/s.vcf.gz"), String::from("indel=/r/i.vcf.gz")]),
        );
        plugins.insert(String::from("LoF"), PluginArgs::Single(String::from("loftee_path:/r/loftee")));
        SarekConfig {
            vep_cache: String::from("/r/vep"),
            fasta: String::from("/r/hg38.fa"),
            fasta_fai: String::from("/r/hg38.fa.fai"),
            dict: String::from("/r/hg38.dict"),
            dbnsfp: String::from("/r/dbNSFP.gz"),
            dbnsfp_tbi: String::from("/r/dbNSFP.gz.tbi"),
            dbnsfp_fields: vec![String::from("SIFT_score"), String::from("CADD_phred")],
            vep_plugins: plugins,
        }
    }

    fn value_after<'a>(cmd: &'a ToolCommand, flag: &str) -> Option<&'a str> {
        cmd.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| cmd.args.get(i + 1))
            .map(|s| s.as_str())
    }

    #[test]
    fn modes_from_str() {
        assert_eq!("annotate".parse::<SarekMode>(), Ok(SarekMode::Annotate));
        assert_eq!("germline".parse::<SarekMode>(), Ok(SarekMode::Germline));
        assert!("somatic".parse::<SarekMode>().is_err());
    }

    #[test]
    fn vep_args_keep_plugin_order() {
        assert_eq!(
            vep_custom_args(&config()),
            "--everything --total_length --offline --cache \
             --plugin SpliceAI,snv=/r/s.vcf.gz,indel=/r/i.vcf.gz \
             --plugin LoF,loftee_path:/r/loftee"
        );
    }

    #[test]
    fn nxf_opts_default_only_when_unset() {
        assert_eq!(resolve_nxf_opts(None), DEFAULT_NXF_OPTS);
        assert_eq!(resolve_nxf_opts(Some(String::from("  "))), DEFAULT_NXF_OPTS);
        assert_eq!(resolve_nxf_opts(Some(String::from("-Xmx4g"))), "-Xmx4g");
    }

    #[test]
    fn annotate_command() {
        let run = SarekRun::new(SarekMode::Annotate, Path::new("/p/in.csv"), Path::new("/p/output"));
        let cmd = build_nextflow_command(&run, &config(), Path::new("/tmp/nf.config"));
        assert_eq!(cmd.program, "nextflow");
        assert_eq!(
            cmd.args[..10],
            ["run", "nf-core/sarek", "-r", "3.5.1", "-resume", "-profile", "singularity", "-c", "/tmp/nf.config", "--input"]
        );
        assert_eq!(value_after(&cmd, "--outdir"), Some("/p/output/sarek_results"));
        assert_eq!(value_after(&cmd, "--step"), Some("annotate"));
        assert_eq!(value_after(&cmd, "--tools"), Some("vep"));
        assert_eq!(value_after(&cmd, "--dbnsfp_fields"), Some("SIFT_score,CADD_phred"));
        assert_eq!(value_after(&cmd, "--wes"), None);
        assert_eq!(
            cmd.envs,
            vec![(String::from("NXF_OPTS"), String::from(DEFAULT_NXF_OPTS))]
        );
    }

    #[test]
    fn germline_command_in_conda() {
        let mut run = SarekRun::new(SarekMode::Germline, Path::new("in.csv"), Path::new("out"));
        run.conda_env = Some(String::from("env_nf"));
        run.extra_configs.push(PathBuf::from("disable_vcftools.config"));
        run.nxf_opts = None;
        let cmd = build_nextflow_command(&run, &config(), Path::new("nf.config"));
        assert_eq!(cmd.program, "conda");
        assert_eq!(cmd.args[..5], ["run", "-n", "env_nf", "nextflow", "run"]);
        assert!(cmd
            .command_line()
            .contains("-c nf.config -c disable_vcftools.config --input in.csv"));
        assert_eq!(value_after(&cmd, "--step"), Some("mapping"));
        assert_eq!(value_after(&cmd, "--tools"), Some("haplotypecaller,vep"));
        assert_eq!(value_after(&cmd, "--aligner"), Some("bwa-mem"));
        assert_eq!(value_after(&cmd, "--joint_germline"), Some("true"));
        assert!(cmd.envs.is_empty());
    }

    #[test]
    fn nextflow_config_content() {
        let res = NextflowResources::default();
        let annotate = render_nextflow_config(SarekMode::Annotate, &res);
        assert!(annotate.contains("pullTimeout = '60m'"));
        assert!(annotate.contains("withName: 'ENSEMBLVEP_VEP'"));
        assert!(annotate.contains("memory = '64 GB'"));
        let germline = render_nextflow_config(SarekMode::Germline, &res);
        assert_eq!(germline, "singularity {\n  pullTimeout = '60m'\n}\n");
    }

    #[test]
    fn successful_run_removes_temp_config() {
        let runner = RecordingRunner::default();
        let run = SarekRun::new(SarekMode::Annotate, Path::new("in.csv"), Path::new("out"));
        run_sarek(&runner, &run, &config()).unwrap();
        let calls = runner.calls.borrow();
        let cfg_path = value_after(&calls[0], "-c").map(PathBuf::from).unwrap();
        assert!(!cfg_path.exists());
    }

    #[test]
    fn failed_run_keeps_temp_config() {
        let runner = RecordingRunner::failing_on("nf-core/sarek");
        let run = SarekRun::new(SarekMode::Germline, Path::new("in.csv"), Path::new("out"));
        assert!(run_sarek(&runner, &run, &config()).is_err());
        let calls = runner.calls.borrow();
        let cfg_path = value_after(&calls[0], "-c").map(PathBuf::from).unwrap();
        assert!(cfg_path.exists());
        assert!(fs::read_to_string(&cfg_path).unwrap().contains("pullTimeout"));
        fs::remove_file(cfg_path).unwrap();
    }
}
