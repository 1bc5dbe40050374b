//! # sarek run-and-process libraries
//!
//! The stages of this suite wrap nf-core/sarek and bcftools. Each stage is a
//! small binary in `src/bin`, the shared parts live here:
//!  - fastq: pairs R1/R2 files and writes the sarek input manifest
//!  - sarek: builds and runs the nextflow command
//!  - bcftools: builds and runs the VCF post-processing commands
//!  - command: the one place where external programs are started
//!  - config, common, logging, error: the plumbing around it
//!
//! No VCF or workflow logic is re-implemented, the external tools stay in
//! charge of that. Everything runs sequentially, one command at a time.

pub mod lib {
    /// functions + structures used by all stages
    pub mod common;
    pub mod error;
    pub mod logging;
    /// running external programs
    pub mod command;
    pub mod config;
    /// R1/R2 pairing and manifest
    pub mod fastq;
    pub mod sarek;
    pub mod bcftools;
}
