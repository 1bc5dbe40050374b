//! ## vcf_filter_impact ##
//! ------------------------
//! Keeps the variants whose split VEP annotation has one of the requested
//! IMPACT tiers (MODERATE and HIGH unless told otherwise).
//! Input: the `*split_vep.vcf[.gz]` files in `<base>/<project>/output`
//! Output: `<base>/<project>/output/s5_filter_impact.vcf[.gz]`

use clap::{app_from_crate,crate_name,crate_description,crate_authors,crate_version,Arg};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use anyhow::{bail, Result};

extern crate sarekpipe;
use sarekpipe::lib::bcftools::{impact_expression, Bcftools, DEFAULT_IMPACTS};
use sarekpipe::lib::command::{bcftools_version, require_conda_env, SystemRunner};
use sarekpipe::lib::common::{*};
use sarekpipe::lib::logging::init_stage;

#[macro_use] extern crate log;

const PROGRAM: &str = "vcf_filter_impact";
const INPUT_MARKER: &str = "split_vep";
const OUTPUT_STEM: &str = "s5_filter_impact";

/// comma separated impact tiers, blanks ignored
fn parse_impacts(text: &str) -> Vec<String> {
    text.split(',')
        .map(|i| i.trim().to_uppercase())
        .filter(|i| !i.is_empty())
        .collect()
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let args_string = args.join(" ");
    let default_impacts = DEFAULT_IMPACTS.join(",");
    let matches = app_from_crate!()
        .about("Filters the split VEP VCFs of a project by VEP IMPACT with bcftools.")
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
        .arg(Arg::with_name("ENV")
                .short("e")
                .long("env")
                .value_name("NAME")
                .help("conda environment providing bcftools, default: bcftools from PATH")
                .takes_value(true))
        .arg(Arg::with_name("IMPACT")
                .short("i")
                .long("impact")
                .value_name("LIST")
                .help("comma separated IMPACT tiers to keep")
                .takes_value(true)
                .default_value(&default_impacts))
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
    let impacts   = parse_impacts(required_arg(&matches, "IMPACT")?);
    if impacts.is_empty() {
        bail!("no IMPACT tiers given");
    }

    let input_dir = layout.output_dir();
    let inputs    = collect_stage_inputs(&input_dir, INPUT_MARKER)?;
    require_conda_env(&runner, conda_env)?;

    let infos = VersionInfo {
        program: PROGRAM,
        version: crate_version!(),
        command: &args_string,
    };
    info!("# --- Filter VCF by VEP IMPACT ---");
    infos.log();
    info!("Project          : {}", project);
    info!("Timestamp        : {}", timestamp());
    info!("Conda env        : {}", conda_env.unwrap_or("-"));
    info!("bcftools version : {}", bcftools_version(&runner, conda_env));
    info!("Input directory  : {}", input_dir.display());
    info!("Output directory : {}", layout.output_dir().display());
    info!("Input VCFs       : {}", vcf_input_count(&inputs));
    info!("Impact filter    : {}", impact_expression(&impacts));

    let output_dir = layout.output_dir();
    let bcftools   = Bcftools::new(&runner, conda_env);
    let n_vcfs     = vcf_input_count(&inputs);
    let summary = process_inputs(
        &inputs,
        |input: &Path| -> Option<PathBuf> {
            stage_output_name(input, OUTPUT_STEM, n_vcfs).map(|n| output_dir.join(n))
        },
        |input, output| bcftools.filter_impact(input, output, &impacts),
    );

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
    fn impact_lists() {
        assert_eq!(parse_impacts("MODERATE,HIGH"), vec!["MODERATE", "HIGH"]);
        assert_eq!(parse_impacts(" high , ,low"), vec!["HIGH", "LOW"]);
        assert!(parse_impacts(" , ").is_empty());
    }
}

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("ERROR: {:#}", e);
        process::exit(1);
    }
}
