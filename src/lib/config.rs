//! JSON configuration files of the stages.
//!
//! A config is only checked for its required top-level keys (all missing keys
//! are reported at once), the paths inside are handed to the tools untouched.
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::lib::error::PipelineError;

pub const SAREK_REQUIRED_KEYS: [&str; 8] = [
    "vep_cache",
    "fasta",
    "fasta_fai",
    "dict",
    "dbnsfp",
    "dbnsfp_tbi",
    "dbnsfp_fields",
    "vep_plugins",
];

/// Arguments of a VEP plugin, either one path or a list of values
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PluginArgs {
    Single(String),
    Many(Vec<String>),
}

impl PluginArgs {
    /// as VEP wants it behind the plugin name
    pub fn joined(&self) -> String {
        match self {
            PluginArgs::Single(s) => s.clone(),
            PluginArgs::Many(v) => v.join(","),
        }
    }
}

/// Reference files and VEP settings for a sarek run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SarekConfig {
    pub vep_cache: String,
    pub fasta: String,
    pub fasta_fai: String,
    pub dict: String,
    pub dbnsfp: String,
    pub dbnsfp_tbi: String,
    pub dbnsfp_fields: Vec<String>,
    /// plugin name -> arguments, in file order
    pub vep_plugins: IndexMap<String, PluginArgs>,
}

/// `columns` of the split-vep config, a list or an already joined string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnList {
    Joined(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct SplitVepConfig {
    columns: ColumnList,
}

#[derive(Debug, Deserialize)]
struct QueryConfig {
    fields: Vec<String>,
}

/// Reads and parses a JSON file
pub fn load_json(path: &Path) -> Result<Value, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::FileNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| PipelineError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// All `keys` have to be present at the top level
pub fn require_keys(path: &Path, value: &Value, keys: &[&str]) -> Result<(), PipelineError> {
    let object = value.as_object().ok_or_else(|| PipelineError::InvalidConfig {
        path: path.to_path_buf(),
        reason: String::from("top level is not a JSON object"),
    })?;
    let missing: Vec<String> = keys
        .iter()
        .filter(|k| !object.contains_key(**k))
        .map(|k| k.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingConfigKeys {
            path: path.to_path_buf(),
            keys: missing,
        })
    }
}

fn load_typed<T: DeserializeOwned>(path: &Path, keys: &[&str]) -> Result<T, PipelineError> {
    let value = load_json(path)?;
    require_keys(path, &value, keys)?;
    serde_json::from_value(value).map_err(|e| PipelineError::InvalidConfig {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn load_sarek_config(path: &Path) -> Result<SarekConfig, PipelineError> {
    load_typed(path, &SAREK_REQUIRED_KEYS)
}

/// VEP columns for `bcftools +split-vep --columns`, comma separated
pub fn load_split_vep_columns(path: &Path) -> Result<String, PipelineError> {
    let cfg: SplitVepConfig = load_typed(path, &["columns"])?;
    let columns = match cfg.columns {
        ColumnList::Joined(s) => s.trim().to_string(),
        ColumnList::List(v) => v.join(","),
    };
    if columns.is_empty() {
        return Err(PipelineError::InvalidConfig {
            path: path.to_path_buf(),
            reason: String::from("no columns defined"),
        });
    }
    Ok(columns)
}

/// Fields for `bcftools query`, at least one
pub fn load_query_fields(path: &Path) -> Result<Vec<String>, PipelineError> {
    let cfg: QueryConfig = load_typed(path, &["fields"])?;
    if cfg.fields.is_empty() {
        return Err(PipelineError::InvalidConfig {
            path: path.to_path_buf(),
            reason: String::from("no fields defined"),
        });
    }
    Ok(cfg.fields)
}
