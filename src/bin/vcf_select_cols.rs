//! ## vcf_select_cols ##
//! ----------------------
//! Extracts the configured fields of the impact filtered VCFs into a tab
//! separated table, one line per sample and variant.
//! Input: the `*filter_impact.vcf[.gz]` files in `<base>/<project>/output`
//! Output: `<base>/<project>/output/s6_select_vep_cols.tsv`, with a header line

use clap::{app_from_crate,crate_name,crate_description,crate_authors,crate_version,Arg};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use anyhow::Result;

extern crate sarekpipe;
use sarekpipe::lib::bcftools::Bcftools;
use sarekpipe::lib::config::load_query_fields;
use sarekpipe::lib::command::{bcftools_version, require_conda_env, SystemRunner};
use sarekpipe::lib::common::{*};
use sarekpipe::lib::logging::init_stage;

#[macro_use] extern crate log;

const PROGRAM: &str = "vcf_select_cols";
const INPUT_MARKER: &str = "filter_impact";
const OUTPUT_NAME: &str = "s6_select_vep_cols.tsv";

/// `s6_select_vep_cols.tsv`, prefixed with the input base name if there
/// is more than one input
fn table_name(input: &Path, n_inputs: usize) -> Option<String> {
    let name = input.file_name()?.to_string_lossy().into_owned();
    VcfKind::from_name(&name)?;
    if n_inputs > 1 {
        Some(format!("{}.{}", vcf_base_name(&name), OUTPUT_NAME))
    } else {
        Some(OUTPUT_NAME.to_string())
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let args_string = args.join(" ");
    let matches = app_from_crate!()
        .about("Writes selected VCF fields of the impact filtered VCFs of a project into a TSV table.")
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
                .help("JSON config with the list of fields under 'fields'")
                .takes_value(true)
                .required(true))
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
    let config    = PathBuf::from(required_arg(&matches, "CONFIG")?);
    let fields    = load_query_fields(&config)?;

    let input_dir = layout.output_dir();
    let inputs    = collect_stage_inputs(&input_dir, INPUT_MARKER)?;
    require_conda_env(&runner, conda_env)?;

    let infos = VersionInfo {
        program: PROGRAM,
        version: crate_version!(),
        command: &args_string,
    };
    info!("# --- Select VEP columns ---");
    infos.log();
    info!("Project          : {}", project);
    info!("Timestamp        : {}", timestamp());
    info!("Conda env        : {}", conda_env.unwrap_or("-"));
    info!("bcftools version : {}", bcftools_version(&runner, conda_env));
    info!("Input directory  : {}", input_dir.display());
    info!("Output directory : {}", layout.output_dir().display());
    info!("Input VCFs       : {}", vcf_input_count(&inputs));
    info!("Config file      : {}", config.display());
    info!("Fields           : {}", fields.join(","));

    let output_dir = layout.output_dir();
    let bcftools   = Bcftools::new(&runner, conda_env);
    let n_vcfs     = vcf_input_count(&inputs);
    let summary = process_inputs(
        &inputs,
        |input: &Path| -> Option<PathBuf> {
            table_name(input, n_vcfs).map(|n| output_dir.join(n))
        },
        |input, output| bcftools.select_columns(input, output, &fields),
    );

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
