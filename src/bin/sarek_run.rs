//! ## sarek_run ##
//! ----------------
//! Runs nf-core/sarek for a project through nextflow, either
//! - `germline`: from the FASTQ manifest through mapping, joint germline
//!   calling with haplotypecaller and VEP annotation, or
//! - `annotate`: VEP annotation of existing VCFs.
//!
//! Reference files, dbNSFP and VEP plugins come from a JSON config.
//! Results land in `<base>/<project>/output/sarek_results`.

use clap::{app_from_crate,crate_name,crate_description,crate_authors,crate_version,Arg};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use anyhow::{anyhow, Result};

extern crate sarekpipe;
use sarekpipe::lib::command::{require_conda_env, SystemRunner};
use sarekpipe::lib::common::{*};
use sarekpipe::lib::config::load_sarek_config;
use sarekpipe::lib::error::PipelineError;
use sarekpipe::lib::logging::init_stage;
use sarekpipe::lib::sarek::{*};

#[macro_use] extern crate log;

const PROGRAM: &str = "sarek_run";

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let args_string = args.join(" ");
    let matches = app_from_crate!()
        .about("Runs nf-core/sarek with nextflow for a project, germline calling or VEP annotation only.")
        .arg(Arg::with_name("PROJECT")
                .short("p")
                .long("project")
                .value_name("NAME")
                .help("project name, also the directory below the base directory")
                .takes_value(true)
                .required(true))
        .arg(Arg::with_name("INPUT")
                .short("i")
                .long("input")
                .value_name("FILE")
                .help("sarek input CSV (FASTQ manifest or VCF sheet)")
                .takes_value(true)
                .required(true))
        .arg(Arg::with_name("BASE")
                .short("o")
                .long("base-dir")
                .value_name("DIR")
                .help("base directory containing the project directory")
                .takes_value(true)
                .default_value("."))
        .arg(Arg::with_name("CONFIG")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON config with reference, dbNSFP and VEP plugin settings")
                .takes_value(true)
                .required(true))
        .arg(Arg::with_name("MODE")
                .short("m")
                .long("mode")
                .value_name("MODE")
                .help("what sarek should do")
                .takes_value(true)
                .possible_values(&["germline", "annotate"])
                .default_value("germline"))
        .arg(Arg::with_name("ENV")
                .short("e")
                .long("env")
                .value_name("NAME")
                .help("conda environment providing nextflow, default: nextflow from PATH")
                .takes_value(true))
        .arg(Arg::with_name("REVISION")
                .short("r")
                .long("revision")
                .value_name("VERSION")
                .help("nf-core/sarek revision")
                .takes_value(true)
                .default_value(DEFAULT_REVISION))
        .arg(Arg::with_name("PROFILE")
                .long("profile")
                .value_name("NAME")
                .help("nextflow profile")
                .takes_value(true)
                .default_value(DEFAULT_PROFILE))
        .arg(Arg::with_name("GENOME")
                .short("g")
                .long("genome")
                .value_name("NAME")
                .help("sarek genome key")
                .takes_value(true)
                .default_value(DEFAULT_GENOME))
        .arg(Arg::with_name("EXTRA")
                .short("x")
                .long("extra-config")
                .value_name("FILE")
                .help("additional nextflow config, can be given several times")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1))
        .arg(Arg::with_name("VERBOSE")
                .short("v")
                .long("verbose")
                .help("debug output")
                .takes_value(false))
        .get_matches();

    let project   = required_arg(&matches, "PROJECT")?;
    let base_dir  = absolute_path(Path::new(required_arg(&matches, "BASE")?))?;
    let conda_env = matches.value_of("ENV");
    let mode: SarekMode = required_arg(&matches, "MODE")?
        .parse()
        .map_err(|e: String| anyhow!(e))?;
    let input       = absolute_path(Path::new(required_arg(&matches, "INPUT")?))?;
    let config_file = absolute_path(Path::new(required_arg(&matches, "CONFIG")?))?;
    let extra_configs = matches
        .values_of("EXTRA")
        .map(|v| v.map(|p| absolute_path(Path::new(p))).collect::<Result<Vec<PathBuf>, _>>())
        .transpose()?
        .unwrap_or_default();
    let layout = ProjectLayout::new(&base_dir, project);
    let runner = SystemRunner;
    // from here on errors end up in the log file as well
    let log_file = init_stage(&layout, PROGRAM, matches.is_present("VERBOSE"))?;
    let start    = Instant::now();

    let config = load_sarek_config(&config_file)?;
    for file in std::iter::once(&input).chain(extra_configs.iter()) {
        if !file.is_file() {
            return Err(PipelineError::FileNotFound(file.clone()).into());
        }
    }
    require_conda_env(&runner, conda_env)?;

    let mut sarek = SarekRun::new(mode, &input, &layout.output_dir());
    sarek.conda_env     = conda_env.map(String::from);
    sarek.revision      = required_arg(&matches, "REVISION")?.to_string();
    sarek.profile       = required_arg(&matches, "PROFILE")?.to_string();
    sarek.genome        = required_arg(&matches, "GENOME")?.to_string();
    sarek.extra_configs = extra_configs;
    sarek.nxf_opts      = Some(resolve_nxf_opts(env::var("NXF_OPTS").ok()));

    let infos = VersionInfo {
        program: PROGRAM,
        version: crate_version!(),
        command: &args_string,
    };
    info!("# --- Run nf-core/sarek ---");
    infos.log();
    info!("Project          : {}", project);
    info!("Timestamp        : {}", timestamp());
    info!("Mode             : {:?} (step {})", mode, mode.step());
    info!("Conda env        : {}", conda_env.unwrap_or("-"));
    info!("Sarek revision   : {}", sarek.revision);
    info!("Profile          : {}", sarek.profile);
    info!("Genome           : {}", sarek.genome);
    info!("Config file      : {}", config_file.display());
    info!("Input file       : {}", input.display());
    info!("Results directory: {}", sarek.results_dir().display());
    for extra in &sarek.extra_configs {
        info!("Extra config     : {}", extra.display());
    }
    info!("NXF_OPTS         : {}", sarek.nxf_opts.as_deref().unwrap_or("-"));

    let result = run_sarek(&runner, &sarek, &config);
    if result.is_ok() {
        info!("Sarek finished, results in {}", sarek.results_dir().display());
    }
    info!("# Runtime: {}", format_runtime(start.elapsed().as_secs_f64()));
    info!("# --- End of run ---");
    println!("Log written to {}", log_file.display());
    result?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("ERROR: {:#}", e);
        process::exit(1);
    }
}
