//! ## vcf_split_vep ##
//! --------------------
//! Splits the VEP CSQ annotation of the PASS filtered VCFs into one INFO tag
//! per configured column (`vep_<COLUMN>`), drops CSQ and keeps only the
//! canonical transcripts. Needs bcftools >= 1.10 for `+split-vep`.
//! Input: the `*PASS.vcf[.gz]` files in `<base>/<project>/output`
//! Output: `<base>/<project>/output/s4_split_vep.vcf[.gz]`
//! Intermediates go to `output/tmp_splitvep` and are removed unless kept.

use clap::{app_from_crate,crate_name,crate_description,crate_authors,crate_version,Arg};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use anyhow::Result;

extern crate sarekpipe;
use sarekpipe::lib::bcftools::{split_vep_temp_paths, Bcftools};
use sarekpipe::lib::command::{bcftools_version, check_min_version, require_conda_env, SystemRunner, SPLIT_VEP_MIN_VERSION};
use sarekpipe::lib::config::load_split_vep_columns;
use sarekpipe::lib::common::{*};
use sarekpipe::lib::logging::init_stage;

#[macro_use] extern crate log;

const PROGRAM: &str = "vcf_split_vep";
const INPUT_MARKER: &str = "PASS";
const OUTPUT_STEM: &str = "s4_split_vep";
const TMP_DIR: &str = "tmp_splitvep";

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let args_string = args.join(" ");
    let matches = app_from_crate!()
        .about("Splits the VEP CSQ field of the PASS filtered VCFs of a project and keeps canonical transcripts.")
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
        .arg(Arg::with_name("CONFIG")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON config with the VEP columns to split out under 'columns'")
                .takes_value(true)
                .required(true))
        .arg(Arg::with_name("KEEP")
                .short("k")
                .long("keep-temp")
                .help("keep the intermediate files for debugging")
                .takes_value(false))
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
    let keep_temp = matches.is_present("KEEP");
    let config    = PathBuf::from(required_arg(&matches, "CONFIG")?);
    let columns   = load_split_vep_columns(&config)?;

    let input_dir = layout.output_dir();
    let inputs    = collect_stage_inputs(&input_dir, INPUT_MARKER)?;
    require_conda_env(&runner, conda_env)?;
    let version = bcftools_version(&runner, conda_env);
    check_min_version("bcftools", &version, SPLIT_VEP_MIN_VERSION)?;

    let infos = VersionInfo {
        program: PROGRAM,
        version: crate_version!(),
        command: &args_string,
    };
    info!("# --- Split VEP annotation ---");
    infos.log();
    info!("Project          : {}", project);
    info!("Timestamp        : {}", timestamp());
    info!("Conda env        : {}", conda_env.unwrap_or("-"));
    info!("bcftools version : {}", version);
    info!("Input directory  : {}", input_dir.display());
    info!("Output directory : {}", layout.output_dir().display());
    info!("Input VCFs       : {}", vcf_input_count(&inputs));
    info!("Config file      : {}", config.display());
    info!("VEP columns      : {}", columns);
    info!("Keep temp files  : {}", keep_temp);

    let output_dir = layout.output_dir();
    let tmp_dir    = output_dir.join(TMP_DIR);
    let (first_split, no_csq) = split_vep_temp_paths(&tmp_dir);
    let bcftools   = Bcftools::new(&runner, conda_env);
    let n_vcfs     = vcf_input_count(&inputs);
    let summary = process_inputs(
        &inputs,
        |input: &Path| -> Option<PathBuf> {
            stage_output_name(input, OUTPUT_STEM, n_vcfs).map(|n| output_dir.join(n))
        },
        |input, output| {
            let result = bcftools.split_vep(input, output, &columns, &tmp_dir);
            cleanup_temp_files(&[first_split.clone(), no_csq.clone()], keep_temp);
            result
        },
    );
    cleanup_temp_files(&[tmp_dir.clone()], keep_temp);

    summary.log();
    info!("# Runtime: {}", format_runtime(start.elapsed().as_secs_f64()));
    info!("# --- End of run ---");
    println!("Log written to {}", log_file.display());
    summary.check()?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("ERROR: {:#}", e);
        process::exit(1);
    }
}
