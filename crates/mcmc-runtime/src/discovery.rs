use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::Result;

const CHAIN_FILE_EXTENSION: &str = ".csv";

/// Derive a chain id from a chain file name.
///
/// The `.csv` extension is stripped. A trailing `_<integer>` becomes
/// `chain_<integer>` so that sampler outputs like `model-20230101_3.csv`
/// group under stable ids; anything else keeps its stem.
pub fn chain_id_from_csv_file_name(file_name: &str) -> String {
    let stem = file_name
        .strip_suffix(CHAIN_FILE_EXTENSION)
        .unwrap_or(file_name);
    if let Some((_, suffix)) = stem.rsplit_once('_')
        && is_canonical_integer(suffix)
    {
        return format!("chain_{}", suffix);
    }
    stem.to_string()
}

fn is_canonical_integer(s: &str) -> bool {
    s.parse::<i64>().is_ok_and(|n| n.to_string() == s)
}

/// Run and chain ids become path components; anything that could escape
/// the monitored root is rejected.
pub(crate) fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && id != "." && !id.contains(['/', '\\']) && !id.contains("..")
}

/// Immediate subdirectories of `root`, sorted by name.
pub fn list_run_ids(root: &Path) -> Result<Vec<String>> {
    let mut run_ids = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            run_ids.push(name.to_string());
        }
    }
    run_ids.sort();
    Ok(run_ids)
}

/// `(chainId, path)` for every `*.csv` file directly inside `run_dir`,
/// sorted by chain id. A missing directory has no chains.
pub fn list_chain_files(run_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !run_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut chains = Vec::new();
    for entry in WalkDir::new(run_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.ends_with(CHAIN_FILE_EXTENSION) {
            chains.push((chain_id_from_csv_file_name(name), entry.path().to_path_buf()));
        }
    }
    chains.sort();
    Ok(chains)
}
