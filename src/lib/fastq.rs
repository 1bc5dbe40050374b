//! # FASTQ mate pairing
//!
//! Scans a directory tree of paired-end FASTQ files and builds the input
//! manifest for nf-core/sarek.
//!
//! A file is a first mate (R1) if it matches one of an ordered list of
//! [`MateMatcher`]s, the first one that matches wins:
//!
//! ```text
//! <prefix>_1[_<digits>].f[ast]q[.gz]    -> mate: <prefix>_2[_<digits>].f[ast]q[.gz]
//! <prefix>_R1[_<digits>].f[ast]q[.gz]   -> mate: <prefix>_R2[_<digits>].f[ast]q[.gz]
//! ```
//!
//! The mate has to sit in the same directory. The lane is taken from an
//! embedded `_L<digits>` token (followed by `.` or `_`) and defaults to `1`.
//! The sample name is the prefix without a trailing lane token, e.g.
//!
//! ```text
//! sampleA_L001_R1_001.fastq.gz  -> sample "sampleA", lane "001"
//! sampleB_1.fq.gz               -> sample "sampleB", lane "1"
//! ```
//!
//! R1 files without mate are collected as [`UnmatchedRead`]s. Files which look
//! a bit like R1 (`_1.fq`, `_R1.fastq`, ...) but fail the strict patterns are
//! only reported as warning, they never become a pair.
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use regex::Regex;

use crate::lib::error::PipelineError;

/// Header of the sarek input CSV
pub const MANIFEST_HEADER: [&str; 5] = ["patient", "sample", "lane", "fastq_1", "fastq_2"];

/// lane used when the filename carries no `_L<digits>` token
pub const DEFAULT_LANE: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateRole {
    First,
    Second,
    Unknown,
}

/// A single sequencing read file as seen during the scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFile {
    pub filename: String,
    pub directory: PathBuf,
    pub role: MateRole,
    /// only derived for first mates
    pub sample: Option<String>,
    pub lane: String,
    /// expected filename of the second mate, first mates only
    pub mate_filename: Option<String>,
}

/// One resolved R1/R2 pair. Both files existed when it was built.
/// Field order defines the manifest sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SamplePair {
    pub sample: String,
    pub lane: String,
    pub fastq_1: PathBuf,
    pub fastq_2: PathBuf,
}

/// An R1 file without R2 partner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedRead {
    pub filename: String,
    pub directory: PathBuf,
}

/// Sample name to patient number, 1-based and dense over the
/// lexicographically sorted distinct sample names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientAssignment {
    ids: BTreeMap<String, usize>,
}

impl PatientAssignment {
    pub fn from_pairs(pairs: &[SamplePair]) -> Self {
        let names: BTreeSet<&str> = pairs.iter().map(|p| p.sample.as_str()).collect();
        let ids = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i + 1))
            .collect();
        PatientAssignment { ids }
    }

    pub fn id(&self, sample: &str) -> Option<usize> {
        self.ids.get(sample).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.ids.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Everything the scan of one directory tree produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// sorted by sample, lane, then paths
    pub pairs: Vec<SamplePair>,
    /// in discovery order
    pub unmatched: Vec<UnmatchedRead>,
    pub patients: PatientAssignment,
}

/// Recognises one first-mate naming convention and knows how to name its mate.
/// The pattern must capture the prefix in front of the tag as group 1,
/// the tag has to follow the prefix directly.
#[derive(Debug, Clone)]
pub struct MateMatcher {
    pattern: Regex,
    first_tag: String,
    second_tag: String,
}

impl MateMatcher {
    pub fn new(pattern: &str, first_tag: &str, second_tag: &str) -> Result<Self, PipelineError> {
        Ok(MateMatcher {
            pattern: Regex::new(pattern)?,
            first_tag: first_tag.to_string(),
            second_tag: second_tag.to_string(),
        })
    }

    pub fn first_tag(&self) -> &str {
        &self.first_tag
    }

    /// prefix in front of the mate tag, `None` if this is not our kind of R1
    pub fn prefix<'a>(&self, filename: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(filename)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|p| filename[p.len()..].starts_with(self.first_tag.as_str()))
    }

    /// Expected R2 filename. Only the matched tag is replaced,
    /// `s_1_1.fq` becomes `s_1_2.fq`.
    ///
    /// Unittest: TRUE
    ///
    /// ```rust
    /// use sarekpipe::lib::fastq::{*};
    ///
    /// let matchers = default_matchers().unwrap();
    /// assert_eq!(matchers[0].second_mate_name("s_1_1.fq").as_deref(), Some("s_1_2.fq"));
    /// assert_eq!(matchers[1].second_mate_name("A_L001_R1_001.fastq.gz").as_deref(), Some("A_L001_R2_001.fastq.gz"));
    /// assert_eq!(matchers[1].second_mate_name("notes.txt"), None);
    /// ```
    pub fn second_mate_name(&self, filename: &str) -> Option<String> {
        let prefix = self.prefix(filename)?;
        let rest = &filename[prefix.len() + self.first_tag.len()..];
        Some(format!("{}{}{}", prefix, self.second_tag, rest))
    }
}

/// The default conventions, in priority order
pub fn default_matchers() -> Result<Vec<MateMatcher>, PipelineError> {
    Ok(vec![
        MateMatcher::new(r"^(.+)_1(_\d+)?\.f(ast)?q(\.gz)?$", "_1", "_2")?,
        MateMatcher::new(r"^(.+)_R1(_\d+)?\.f(ast)?q(\.gz)?$", "_R1", "_R2")?,
    ])
}

/// What happened to a single file during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Paired,
    Unmatched,
    LookAlike,
    Ignored,
}

/// Walks a directory tree and pairs up mates
#[derive(Debug, Clone)]
pub struct MateResolver {
    matchers: Vec<MateMatcher>,
    second_mate: Regex,
    looks_like_first_mate: Regex,
    lane: Regex,
    trailing_lane: Regex,
}

impl MateResolver {
    pub fn new() -> Result<Self, PipelineError> {
        MateResolver::with_matchers(default_matchers()?)
    }

    pub fn with_matchers(matchers: Vec<MateMatcher>) -> Result<Self, PipelineError> {
        Ok(MateResolver {
            matchers,
            second_mate: Regex::new(r"^(.+)_R?2(_\d+)?\.f(ast)?q(\.gz)?$")?,
            // looser than the matchers: no anchoring, anything may follow
            looks_like_first_mate: Regex::new(r"(_1(_\d+)?\.f(ast)?q)|(_R1(_\d+)?\.f(ast)?q)")?,
            lane: Regex::new(r"_L(\d+)[._]")?,
            trailing_lane: Regex::new(r"_L\d+$")?,
        })
    }

    /// lane token of a filename or the default lane
    pub fn lane_of(&self, filename: &str) -> String {
        self.lane
            .captures(filename)
            .and_then(|c| c.get(1))
            .map_or_else(|| DEFAULT_LANE.to_string(), |m| m.as_str().to_string())
    }

    fn sample_of(&self, prefix: &str) -> String {
        self.trailing_lane.replace(prefix, "").into_owned()
    }

    /// Classifies a file name without touching the filesystem
    pub fn inspect(&self, directory: &Path, filename: &str) -> ReadFile {
        for matcher in &self.matchers {
            if let Some(prefix) = matcher.prefix(filename) {
                return ReadFile {
                    filename: filename.to_string(),
                    directory: directory.to_path_buf(),
                    role: MateRole::First,
                    sample: Some(self.sample_of(prefix)),
                    lane: self.lane_of(filename),
                    mate_filename: matcher.second_mate_name(filename),
                };
            }
        }
        let role = if self.second_mate.is_match(filename) {
            MateRole::Second
        } else {
            MateRole::Unknown
        };
        ReadFile {
            filename: filename.to_string(),
            directory: directory.to_path_buf(),
            role,
            sample: None,
            lane: self.lane_of(filename),
            mate_filename: None,
        }
    }

    /// true for names that resemble R1 but none of the matchers took them
    pub fn looks_like_first_mate(&self, filename: &str) -> bool {
        self.looks_like_first_mate.is_match(filename)
    }

    /// Scans `root` recursively. Only a missing or unreadable root is fatal.
    pub fn resolve(&self, root: &Path) -> Result<Resolution, PipelineError> {
        if !root.is_dir() {
            return Err(PipelineError::DirectoryNotFound(root.to_path_buf()));
        }
        let mut pairs = Vec::new();
        let mut unmatched = Vec::new();
        // the root has to be readable, sub-directories may fail
        let entries = sorted_entries(root)?;
        self.scan_dir(root, entries, &mut pairs, &mut unmatched);

        pairs.sort();
        let patients = PatientAssignment::from_pairs(&pairs);
        Ok(Resolution {
            pairs,
            unmatched,
            patients,
        })
    }

    fn scan_dir(
        &self,
        dir: &Path,
        entries: Vec<PathBuf>,
        pairs: &mut Vec<SamplePair>,
        unmatched: &mut Vec<UnmatchedRead>,
    ) {
        let mut sub_dirs = Vec::new();
        for path in entries {
            if path.is_dir() {
                // symlinked directories are not followed
                if !path.symlink_metadata().map(|m| m.file_type().is_symlink()).unwrap_or(true) {
                    sub_dirs.push(path);
                }
                continue;
            }
            let filename = match path.file_name() {
                Some(f) => f.to_string_lossy().into_owned(),
                None => continue,
            };
            self.visit_file(dir, &filename, pairs, unmatched);
        }
        for sub in sub_dirs {
            match sorted_entries(&sub) {
                Ok(entries) => self.scan_dir(&sub, entries, pairs, unmatched),
                Err(e) => warn!("Could not read directory {}: {}", sub.display(), e),
            }
        }
    }

    fn visit_file(
        &self,
        dir: &Path,
        filename: &str,
        pairs: &mut Vec<SamplePair>,
        unmatched: &mut Vec<UnmatchedRead>,
    ) -> FileOutcome {
        let read = self.inspect(dir, filename);
        match (read.role, read.sample, read.mate_filename) {
            (MateRole::First, Some(sample), Some(mate)) => {
                let mate_path = dir.join(&mate);
                // a directory named like the mate does not count
                if mate_path.is_file() {
                    debug!("Paired {} with {}", filename, mate);
                    pairs.push(SamplePair {
                        sample,
                        lane: read.lane,
                        fastq_1: dir.join(filename),
                        fastq_2: mate_path,
                    });
                    FileOutcome::Paired
                } else {
                    warn!("R1 file '{}' has no matching R2 in {}", filename, dir.display());
                    unmatched.push(UnmatchedRead {
                        filename: filename.to_string(),
                        directory: dir.to_path_buf(),
                    });
                    FileOutcome::Unmatched
                }
            }
            _ if self.looks_like_first_mate(filename) => {
                warn!("File '{}' looks like R1 but does not match expected pattern", filename);
                FileOutcome::LookAlike
            }
            (role, _, _) => {
                debug!("Ignoring {} ({:?})", filename, role);
                FileOutcome::Ignored
            }
        }
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut entries = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    Ok(entries)
}

/// Writes the sarek input CSV, rows in the order of `pairs`
pub fn write_manifest_to<W: Write>(
    writer: W,
    pairs: &[SamplePair],
    patients: &PatientAssignment,
) -> Result<(), PipelineError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(MANIFEST_HEADER)?;
    for pair in pairs {
        let patient = patients
            .id(&pair.sample)
            .map(|id| id.to_string())
            .unwrap_or_default();
        let fastq_1 = pair.fastq_1.to_string_lossy();
        let fastq_2 = pair.fastq_2.to_string_lossy();
        csv_writer.write_record([
            patient.as_str(),
            pair.sample.as_str(),
            pair.lane.as_str(),
            &*fastq_1,
            &*fastq_2,
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_manifest(path: &Path, resolution: &Resolution) -> Result<(), PipelineError> {
    let file = fs::File::create(path)?;
    write_manifest_to(file, &resolution.pairs, &resolution.patients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn touch(dir: &Path, names: &[&str]) {
        for n in names {
            File::create(dir.join(n)).expect("ERROR: could not create fastq file!");
        }
    }

    fn manifest_string(res: &Resolution) -> String {
        let mut buf = Vec::new();
        write_manifest_to(&mut buf, &res.pairs, &res.patients).unwrap();
        String::from_utf8(buf).unwrap()
    }

    ///////////////////////
    ///   matchers    /////
    ///////////////////////
    #[test]
    fn underscore_one_matcher() {
        let m = &default_matchers().unwrap()[0];
        assert_eq!(m.second_mate_name("sampleB_1.fq.gz").as_deref(), Some("sampleB_2.fq.gz"));
        assert_eq!(m.second_mate_name("s_1_001.fastq").as_deref(), Some("s_2_001.fastq"));
        assert_eq!(m.second_mate_name("s_R1.fastq"), None);
        assert_eq!(m.second_mate_name("s_11.fq"), None);
    }

    #[test]
    fn r_one_matcher() {
        let m = &default_matchers().unwrap()[1];
        assert_eq!(
            m.second_mate_name("sampleA_L001_R1_001.fastq.gz").as_deref(),
            Some("sampleA_L001_R2_001.fastq.gz")
        );
        assert_eq!(m.second_mate_name("x_R1.fq").as_deref(), Some("x_R2.fq"));
        assert_eq!(m.second_mate_name("x_R1.fastq.bz2"), None);
        assert_eq!(m.second_mate_name("x_R2.fq"), None);
    }

    #[test]
    fn only_the_matched_tag_is_replaced() {
        let m = &default_matchers().unwrap()[0];
        assert_eq!(m.second_mate_name("s_1_1.fq").as_deref(), Some("s_1_2.fq"));
        let m = &default_matchers().unwrap()[1];
        assert_eq!(m.second_mate_name("run_R1_x_R1.fq").as_deref(), Some("run_R1_x_R2.fq"));
    }

    #[test]
    fn inspect_first_mate() {
        let r = MateResolver::new().unwrap();
        let read = r.inspect(Path::new("/data"), "sampleA_L001_R1_001.fastq.gz");
        assert_eq!(read.role, MateRole::First);
        assert_eq!(read.sample.as_deref(), Some("sampleA"));
        assert_eq!(read.lane, "001");
        assert_eq!(read.mate_filename.as_deref(), Some("sampleA_L001_R2_001.fastq.gz"));
    }

    #[test]
    fn inspect_other_files() {
        let r = MateResolver::new().unwrap();
        assert_eq!(r.inspect(Path::new("."), "sampleA_R2.fq").role, MateRole::Second);
        assert_eq!(r.inspect(Path::new("."), "sampleB_2.fastq.gz").role, MateRole::Second);
        assert_eq!(r.inspect(Path::new("."), "notes.txt").role, MateRole::Unknown);
    }

    #[test]
    fn lane_tokens() {
        let r = MateResolver::new().unwrap();
        assert_eq!(r.lane_of("s_L002_R1.fq"), "002");
        assert_eq!(r.lane_of("s_L7.R1.fq"), "7");
        assert_eq!(r.lane_of("s_R1.fq"), DEFAULT_LANE);
        // lane token needs a separator behind it
        assert_eq!(r.lane_of("s_LANE_R1.fq"), DEFAULT_LANE);
    }

    #[test]
    fn loose_check() {
        let r = MateResolver::new().unwrap();
        assert!(r.looks_like_first_mate("sampleD_R1.fastq.bz2"));
        assert!(r.looks_like_first_mate("sampleD_1.fq.tmp"));
        assert!(!r.looks_like_first_mate("sampleD_R2.fastq"));
    }

    ///////////////////////
    ///   resolving   /////
    ///////////////////////
    #[test]
    fn illumina_pair() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["sampleA_L001_R1_001.fastq.gz", "sampleA_L001_R2_001.fastq.gz"]);
        let res = MateResolver::new().unwrap().resolve(dir.path()).unwrap();
        assert_eq!(
            res.pairs,
            vec![SamplePair {
                sample: String::from("sampleA"),
                lane: String::from("001"),
                fastq_1: dir.path().join("sampleA_L001_R1_001.fastq.gz"),
                fastq_2: dir.path().join("sampleA_L001_R2_001.fastq.gz"),
            }]
        );
        assert!(res.unmatched.is_empty());
    }

    #[test]
    fn numbered_pair_without_lane() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["sampleB_1.fq.gz", "sampleB_2.fq.gz"]);
        let res = MateResolver::new().unwrap().resolve(dir.path()).unwrap();
        assert_eq!(res.pairs.len(), 1);
        assert_eq!(res.pairs[0].sample, "sampleB");
        assert_eq!(res.pairs[0].lane, "1");
        assert_eq!(res.pairs[0].fastq_2, dir.path().join("sampleB_2.fq.gz"));
    }

    #[test]
    fn orphan_first_mate() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["sampleC_R1.fastq"]);
        let res = MateResolver::new().unwrap().resolve(dir.path()).unwrap();
        assert!(res.pairs.is_empty());
        assert_eq!(
            res.unmatched,
            vec![UnmatchedRead {
                filename: String::from("sampleC_R1.fastq"),
                directory: dir.path().to_path_buf(),
            }]
        );
    }

    #[test]
    fn look_alikes_and_strangers_are_skipped() {
        let dir = tempdir().unwrap();
        touch(
            dir.path(),
            &["sampleD_R1.fastq.bz2", "sampleD_R2.fastq.bz2", "lonely_R2.fq", "README.md"],
        );
        let res = MateResolver::new().unwrap().resolve(dir.path()).unwrap();
        assert!(res.pairs.is_empty());
        assert!(res.unmatched.is_empty());
        assert!(res.patients.is_empty());
    }

    #[test]
    fn mates_must_share_a_directory() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        touch(&a, &["s1_R1.fq", "s2_R1.fq", "s2_R2.fq"]);
        touch(&b, &["s1_R2.fq"]);
        let res = MateResolver::new().unwrap().resolve(dir.path()).unwrap();
        assert_eq!(res.pairs.len(), 1);
        assert_eq!(res.pairs[0].sample, "s2");
        assert_eq!(res.unmatched.len(), 1);
        assert_eq!(res.unmatched[0].filename, "s1_R1.fq");
        assert_eq!(res.unmatched[0].directory, a);
    }

    #[test]
    fn unmatched_keep_discovery_order() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        touch(dir.path(), &["b_R1.fq", "a_R1.fq"]);
        touch(&sub, &["0_R1.fq"]);
        let res = MateResolver::new().unwrap().resolve(dir.path()).unwrap();
        let names: Vec<&str> = res.unmatched.iter().map(|u| u.filename.as_str()).collect();
        // files of a directory come before its sub-directories
        assert_eq!(names, vec!["a_R1.fq", "b_R1.fq", "0_R1.fq"]);
    }

    #[test]
    fn patients_are_dense_and_sorted() {
        let dir = tempdir().unwrap();
        touch(
            dir.path(),
            &[
                "zeta_L001_R1.fq", "zeta_L001_R2.fq",
                "zeta_L002_R1.fq", "zeta_L002_R2.fq",
                "alpha_1.fq", "alpha_2.fq",
                "mid_R1_001.fastq", "mid_R2_001.fastq",
            ],
        );
        let res = MateResolver::new().unwrap().resolve(dir.path()).unwrap();
        let ids: Vec<(&str, usize)> = res.patients.iter().collect();
        assert_eq!(ids, vec![("alpha", 1), ("mid", 2), ("zeta", 3)]);

        let order: Vec<(&str, &str)> = res
            .pairs
            .iter()
            .map(|p| (p.sample.as_str(), p.lane.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("alpha", "1"), ("mid", "1"), ("zeta", "001"), ("zeta", "002")]
        );
    }

    #[test]
    fn missing_directory_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            MateResolver::new().unwrap().resolve(&missing),
            Err(PipelineError::DirectoryNotFound(p)) if p == missing
        ));
    }

    #[test]
    fn directory_named_like_the_mate_is_no_mate() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["s_R1.fq"]);
        fs::create_dir(dir.path().join("s_R2.fq")).unwrap();
        let res = MateResolver::new().unwrap().resolve(dir.path()).unwrap();
        assert!(res.pairs.is_empty());
        assert_eq!(res.unmatched.len(), 1);
        assert_eq!(res.unmatched[0].filename, "s_R1.fq");
        assert_eq!(res.unmatched[0].directory, dir.path());
    }

    #[test]
    fn file_outcomes() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["p_R1.fq", "p_R2.fq", "q_R1.fq"]);
        let resolver = MateResolver::new().unwrap();
        let mut pairs = Vec::new();
        let mut unmatched = Vec::new();
        let mut visit = |name: &str| resolver.visit_file(dir.path(), name, &mut pairs, &mut unmatched);
        assert_eq!(visit("p_R1.fq"), FileOutcome::Paired);
        assert_eq!(visit("q_R1.fq"), FileOutcome::Unmatched);
        assert_eq!(visit("sampleD_R1.fastq.bz2"), FileOutcome::LookAlike);
        assert_eq!(visit("notes.txt"), FileOutcome::Ignored);
        assert_eq!(visit("p_R2.fq"), FileOutcome::Ignored);
        // look-alikes never end up in the results
        assert_eq!(pairs.len(), 1);
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].filename, "q_R1.fq");
    }

    ///////////////////////
    ///   manifest    /////
    ///////////////////////
    #[test]
    fn manifest_rows() {
        let dir = tempdir().unwrap();
        touch(
            dir.path(),
            &["b_1.fq", "b_2.fq", "a_L003_R1.fq.gz", "a_L003_R2.fq.gz"],
        );
        let res = MateResolver::new().unwrap().resolve(dir.path()).unwrap();
        let d = dir.path().display();
        let expected = format!(
            "patient,sample,lane,fastq_1,fastq_2\n\
             1,a,003,{d}/a_L003_R1.fq.gz,{d}/a_L003_R2.fq.gz\n\
             2,b,1,{d}/b_1.fq,{d}/b_2.fq\n",
            d = d
        );
        assert_eq!(manifest_string(&res), expected);
    }

    #[test]
    fn rerun_gives_identical_manifest() {
        let dir = tempdir().unwrap();
        touch(
            dir.path(),
            &["x_R1.fq", "x_R2.fq", "y_L1_R1_001.fq", "y_L1_R2_001.fq", "z_R1.fq"],
        );
        let resolver = MateResolver::new().unwrap();
        let first = resolver.resolve(dir.path()).unwrap();
        let second = resolver.resolve(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(manifest_string(&first), manifest_string(&second));

        let out = dir.path().join("manifest.csv");
        write_manifest(&out, &first).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), manifest_string(&first));
    }
}
