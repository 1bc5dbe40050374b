//! ## sarek_fastq_input ##
//! ------------------------
//! Scans a FASTQ directory tree, pairs every R1 file with its R2 mate and
//! writes the input manifest nf-core/sarek expects:
//! `patient,sample,lane,fastq_1,fastq_2`.
//! Samples are numbered as patients in sorted order. R1 files without mate
//! are reported but not written.
//! Output: `<base>/<project>/output/sarek_fastq_input_<project>.csv`

use clap::{app_from_crate,crate_name,crate_description,crate_authors,crate_version,Arg};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use anyhow::{Context, Result};

extern crate sarekpipe;
use sarekpipe::lib::common::{*};
use sarekpipe::lib::error::PipelineError;
use sarekpipe::lib::fastq::{write_manifest, MateResolver};
use sarekpipe::lib::logging::init_stage;

#[macro_use] extern crate log;

const PROGRAM: &str = "sarek_fastq_input";

fn manifest_path(layout: &ProjectLayout) -> PathBuf {
    layout
        .output_dir()
        .join(format!("{}_{}.csv", PROGRAM, layout.project))
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let args_string = args.join(" ");
    let matches = app_from_crate!()
        .about("Pairs the R1/R2 FASTQ files below a directory and writes the sarek input CSV.")
        .arg(Arg::with_name("PROJECT")
                .short("p")
                .long("project")
                .value_name("NAME")
                .help("project name, also the directory below the base directory")
                .takes_value(true)
                .required(true))
        .arg(Arg::with_name("FASTQ")
                .short("f")
                .long("fastq-dir")
                .value_name("DIR")
                .help("directory with the FASTQ files, searched recursively")
                .takes_value(true)
                .required(true))
        .arg(Arg::with_name("BASE")
                .short("o")
                .long("base-dir")
                .value_name("DIR")
                .help("base directory containing the project directory")
                .takes_value(true)
                .default_value("."))
        .arg(Arg::with_name("VERBOSE")
                .short("v")
                .long("verbose")
                .help("debug output")
                .takes_value(false))
        .get_matches();

    let project   = required_arg(&matches, "PROJECT")?;
    let base_dir  = absolute_path(Path::new(required_arg(&matches, "BASE")?))?;
    let fastq_dir = PathBuf::from(required_arg(&matches, "FASTQ")?);
    // nothing gets written for a missing FASTQ directory, not even the log
    if !fastq_dir.is_dir() {
        return Err(PipelineError::DirectoryNotFound(fastq_dir).into());
    }
    let fastq_dir = fastq_dir
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", fastq_dir.display()))?;
    let layout = ProjectLayout::new(&base_dir, project);

    let log_file = init_stage(&layout, PROGRAM, matches.is_present("VERBOSE"))?;
    let start    = Instant::now();
    let infos = VersionInfo {
        program: PROGRAM,
        version: crate_version!(),
        command: &args_string,
    };
    info!("# --- Generate FASTQ input file for sarek ---");
    infos.log();
    info!("Project          : {}", project);
    info!("Timestamp        : {}", timestamp());
    info!("FASTQ directory  : {}", fastq_dir.display());
    info!("Output directory : {}", layout.output_dir().display());

    let resolver   = MateResolver::new()?;
    let resolution = resolver.resolve(&fastq_dir)?;
    let manifest   = manifest_path(&layout);
    write_manifest(&manifest, &resolution)?;

    info!("CSV written: {}", manifest.display());
    info!("Total paired FASTQs: {}", resolution.pairs.len());
    info!("Total patients: {}", resolution.patients.len());
    for (sample, id) in resolution.patients.iter() {
        debug!("patient {} = {}", id, sample);
    }
    info!("Total unmatched R1 files: {}", resolution.unmatched.len());
    for unmatched in &resolution.unmatched {
        warn!(
            "Unmatched R1 file: {}",
            unmatched.directory.join(&unmatched.filename).display()
        );
    }
    if resolution.pairs.is_empty() {
        warn!("No FASTQ pairs found, the manifest only has a header.");
    }

    info!("# Runtime: {}", format_runtime(start.elapsed().as_secs_f64()));
    info!("# --- End of run ---");
    println!("Log written to {}", log_file.display());
    Ok(())
}


fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("ERROR: {:#}", e);
        process::exit(1);
    }
}
