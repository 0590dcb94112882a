use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of one materialized column: `(runId, chainId, variableName)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceKey {
    pub run_id: String,
    pub chain_id: String,
    pub variable_name: String,
}

impl SequenceKey {
    pub fn new(
        run_id: impl Into<String>,
        chain_id: impl Into<String>,
        variable_name: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            chain_id: chain_id.into(),
            variable_name: variable_name.into(),
        }
    }

    /// Key of the per-chain stats entry: `run/chain/variable`.
    pub fn sequence_stats_key(&self) -> String {
        format!("{}/{}/{}", self.run_id, self.chain_id, self.variable_name)
    }

    /// Key of the aggregate stats entry across chains: `run/variable`.
    pub fn variable_stats_key(&self) -> String {
        format!("{}/{}", self.run_id, self.variable_name)
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sequence_stats_key())
    }
}

/// Client-side cached column.
///
/// `data` is shared so that a merge which changes nothing can hand back the
/// very same allocation (`Arc::ptr_eq` identifies no-op merges).
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub key: SequenceKey,
    pub data: Arc<Vec<f64>>,
    pub update_requested: bool,
}

impl Sequence {
    pub fn empty(key: SequenceKey) -> Self {
        Self {
            key,
            data: Arc::new(Vec::new()),
            update_requested: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
