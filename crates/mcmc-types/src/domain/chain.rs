use serde::{Deserialize, Serialize};

/// Chain metadata as reported by a chain listing.
///
/// `variable_names` is fixed once the column-name row of the chain file has
/// been parsed. `last_change_timestamp` is milliseconds since the Unix epoch
/// of the most recent ingestion that consumed at least one line (0 if none).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    pub run_id: String,
    pub chain_id: String,
    pub variable_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_footer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_prefixes_excluded: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_initial_iteration_count: Option<usize>,
    pub last_change_timestamp: i64,
}

impl Chain {
    /// Key shared with the registry: `runId/chainId`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.run_id, self.chain_id)
    }
}
