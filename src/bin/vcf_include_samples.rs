//! ## vcf_include_samples ##
//! --------------------------
//! Restricts a multi-sample VCF to the samples of a sample list before it
//! goes into annotation. The list has one sample per line, names starting
//! with `^` are dropped. A list of only `^` names keeps all other samples.
//! Output: `<base>/<project>/output/<input base>.included_samples.vcf[.gz]`

use clap::{app_from_crate,crate_name,crate_description,crate_authors,crate_version,Arg};
use std::env;
use std::path::Path;
use std::process;
use std::time::Instant;
use anyhow::{bail, Result};

extern crate sarekpipe;
use sarekpipe::lib::bcftools::Bcftools;
use sarekpipe::lib::error::PipelineError;
use sarekpipe::lib::command::{bcftools_version, require_conda_env, SystemRunner};
use sarekpipe::lib::common::{*};
use sarekpipe::lib::logging::init_stage;

#[macro_use] extern crate log;

const PROGRAM: &str = "vcf_include_samples";
const OUTPUT_STEM: &str = "included_samples";

/// `<base>.included_samples.vcf[.gz]`, always prefixed as the input name is
/// the only thing telling the outputs of different runs apart
fn included_name(input: &Path) -> Option<String> {
    let name = input.file_name()?.to_string_lossy().into_owned();
    let kind = VcfKind::from_name(&name)?;
    Some(format!("{}.{}{}", vcf_base_name(&name), OUTPUT_STEM, kind.extension()))
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let args_string = args.join(" ");
    let matches = app_from_crate!()
        .about("Keeps only the samples of a sample list in a VCF with bcftools.")
        .arg(Arg::with_name("PROJECT")
                .short("p")
                .long("project")
                .value_name("NAME")
                .help("project name, also the directory below the base directory")
                .takes_value(true)
                .required(true))
        .arg(Arg::with_name("BASE")
                .short("o")
                .long("base-dir")
                .value_name("DIR")
                .help("base directory containing the project directory")
                .takes_value(true)
                .default_value("."))
        .arg(Arg::with_name("INPUT")
                .short("i")
                .long("input")
                .value_name("FILE")
                .help("the VCF to subset (.vcf or .vcf.gz)")
                .takes_value(true)
                .required(true))
        .arg(Arg::with_name("SAMPLES")
                .short("s")
                .long("samples")
                .value_name("FILE")
                .help("sample list, one sample name per line")
                .takes_value(true)
                .required(true))
        .arg(Arg::with_name("ENV")
                .short("e")
                .long("env")
                .value_name("NAME")
                .help("conda environment providing bcftools, default: bcftools from PATH")
                .takes_value(true))
        .arg(Arg::with_name("VERBOSE")
                .short("v")
                .long("verbose")
                .help("debug output")
                .takes_value(false))
        .get_matches();

    let project   = required_arg(&matches, "PROJECT")?;
    let base_dir  = absolute_path(Path::new(required_arg(&matches, "BASE")?))?;
    let conda_env = matches.value_of("ENV");
    let layout    = ProjectLayout::new(&base_dir, project);
    let runner    = SystemRunner;
    // from here on errors end up in the log file as well
    let log_file = init_stage(&layout, PROGRAM, matches.is_present("VERBOSE"))?;
    let start    = Instant::now();
    let input     = absolute_path(Path::new(required_arg(&matches, "INPUT")?))?;
    let samples   = absolute_path(Path::new(required_arg(&matches, "SAMPLES")?))?;

    if !input.is_file() {
        return Err(PipelineError::FileNotFound(input).into());
    }
    let output_name = match included_name(&input) {
        Some(n) => n,
        None => bail!("input {} is not a .vcf or .vcf.gz file", input.display()),
    };
    let (included, excluded) = parse_sample_list(&samples)?;
    if included.is_empty() && excluded.is_empty() {
        bail!("sample list {} is empty", samples.display());
    }
    require_conda_env(&runner, conda_env)?;

    let infos = VersionInfo {
        program: PROGRAM,
        version: crate_version!(),
        command: &args_string,
    };
    info!("# --- Include samples in VCF ---");
    infos.log();
    info!("Project          : {}", project);
    info!("Timestamp        : {}", timestamp());
    info!("Conda env        : {}", conda_env.unwrap_or("-"));
    info!("bcftools version : {}", bcftools_version(&runner, conda_env));
    info!("Input VCF        : {}", input.display());
    info!("Sample list      : {}", samples.display());
    info!("Output directory : {}", layout.output_dir().display());
    if included.is_empty() {
        info!("Included samples : all except the excluded ones");
    } else {
        info!("Included samples : {} ({})", included.len(), included.join(", "));
    }
    if !excluded.is_empty() {
        info!("Excluded samples : {} ({})", excluded.len(), excluded.join(", "));
    }

    let output   = layout.output_dir().join(output_name);
    let bcftools = Bcftools::new(&runner, conda_env);
    let mut summary = RunSummary::new(1);
    match bcftools.include_samples(&input, &included, &excluded, &output) {
        Ok(()) => {
            info!("VCF written: {}", output.display());
            summary.record(true);
        }
        Err(e) => {
            error!("Failed to include samples: {}", e);
            summary.record(false);
        }
    }

    summary.log();
    info!("# Runtime: {}", format_runtime(start.elapsed().as_secs_f64()));
    info!("# --- End of run ---");
    println!("Log written to {}", log_file.display());
    summary.check()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names() {
        assert_eq!(
            included_name(Path::new("/d/joint_germline.vcf.gz")).as_deref(),
            Some("joint_germline.included_samples.vcf.gz")
        );
        assert_eq!(
            included_name(Path::new("cohort.vcf")).as_deref(),
            Some("cohort.included_samples.vcf")
        );
        assert_eq!(included_name(Path::new("cohort.bcf")), None);
    }
}

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("ERROR: {:#}", e);
        process::exit(1);
    }
}
