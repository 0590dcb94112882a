//! Request/response shapes exchanged between the monitor service and its
//! viewers.
//!
//! Every message is a JSON object tagged by `type`. Sequence requests carry
//! the number of rows the requester already holds (`position`); responses
//! carry only the values at row indices `[position, currentLength)`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{Chain, Run, SequenceKey};

pub const PROTOCOL_VERSION: &str = "0.1.3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MonitorRequest {
    ProbeRequest,
    GetRunsRequest,
    GetChainsForRunRequest { run_id: String },
    GetSequencesRequest { sequences: Vec<SequenceRequest> },
}

impl MonitorRequest {
    /// Short name used in request logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorRequest::ProbeRequest => "probe",
            MonitorRequest::GetRunsRequest => "getRuns",
            MonitorRequest::GetChainsForRunRequest { .. } => "getChainsForRun",
            MonitorRequest::GetSequencesRequest { .. } => "getSequences",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MonitorResponse {
    ProbeResponse {
        protocol_version: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        proxy: Option<bool>,
    },
    GetRunsResponse {
        runs: Vec<Run>,
    },
    GetChainsForRunResponse {
        chains: Vec<Chain>,
    },
    GetSequencesResponse {
        sequences: Vec<SequenceUpdate>,
    },
    ErrorResponse {
        error: String,
    },
}

impl MonitorResponse {
    /// Short name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorResponse::ProbeResponse { .. } => "probe",
            MonitorResponse::GetRunsResponse { .. } => "getRuns",
            MonitorResponse::GetChainsForRunResponse { .. } => "getChainsForRun",
            MonitorResponse::GetSequencesResponse { .. } => "getSequences",
            MonitorResponse::ErrorResponse { .. } => "error",
        }
    }
}

/// One tuple of a sequence request: "I already have `position` rows".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceRequest {
    pub run_id: String,
    pub chain_id: String,
    pub variable_name: String,
    pub position: usize,
}

impl SequenceRequest {
    pub fn new(key: &SequenceKey, position: usize) -> Self {
        Self {
            run_id: key.run_id.clone(),
            chain_id: key.chain_id.clone(),
            variable_name: key.variable_name.clone(),
            position,
        }
    }

    pub fn key(&self) -> SequenceKey {
        SequenceKey::new(&self.run_id, &self.chain_id, &self.variable_name)
    }
}

/// The delta answering one [`SequenceRequest`].
///
/// `position` echoes the request; `data` holds the values from that row on.
/// Cells that did not parse as numbers travel as JSON `null` and come back
/// as `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceUpdate {
    pub run_id: String,
    pub chain_id: String,
    pub variable_name: String,
    pub position: usize,
    #[serde(deserialize_with = "deserialize_nullable_values")]
    pub data: Vec<f64>,
}

impl SequenceUpdate {
    pub fn key(&self) -> SequenceKey {
        SequenceKey::new(&self.run_id, &self.chain_id, &self.variable_name)
    }
}

fn deserialize_nullable_values<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_tags_are_camel_case() {
        let request: MonitorRequest = serde_json::from_value(json!({
            "type": "getChainsForRunRequest",
            "runId": "run-a"
        }))
        .unwrap();
        assert_eq!(
            request,
            MonitorRequest::GetChainsForRunRequest {
                run_id: "run-a".to_string()
            }
        );

        let probe: MonitorRequest = serde_json::from_str(r#"{"type":"probeRequest"}"#).unwrap();
        assert_eq!(probe, MonitorRequest::ProbeRequest);
    }

    #[test]
    fn test_sequences_request_wire_shape() {
        let request = MonitorRequest::GetSequencesRequest {
            sequences: vec![SequenceRequest::new(
                &SequenceKey::new("run-a", "chain_1", "lp__"),
                2,
            )],
        };
        insta::assert_json_snapshot!(request, @r#"
        {
          "type": "getSequencesRequest",
          "sequences": [
            {
              "runId": "run-a",
              "chainId": "chain_1",
              "variableName": "lp__",
              "position": 2
            }
          ]
        }
        "#);
    }

    #[test]
    fn test_chain_optional_fields_are_omitted() {
        let chain = Chain {
            run_id: "run-a".to_string(),
            chain_id: "chain_1".to_string(),
            variable_names: vec!["lp__".to_string()],
            raw_header: None,
            raw_footer: None,
            variable_prefixes_excluded: None,
            excluded_initial_iteration_count: None,
            last_change_timestamp: 0,
        };
        insta::assert_json_snapshot!(chain, @r#"
        {
          "runId": "run-a",
          "chainId": "chain_1",
          "variableNames": [
            "lp__"
          ],
          "lastChangeTimestamp": 0
        }
        "#);
    }

    #[test]
    fn test_null_values_decode_as_nan() {
        let update: SequenceUpdate = serde_json::from_value(json!({
            "runId": "r",
            "chainId": "c",
            "variableName": "v",
            "position": 3,
            "data": [1.5, null, 2.5]
        }))
        .unwrap();
        assert_eq!(update.position, 3);
        assert_eq!(update.data.len(), 3);
        assert_eq!(update.data[0], 1.5);
        assert!(update.data[1].is_nan());
        assert_eq!(update.data[2], 2.5);
    }

    #[test]
    fn test_non_finite_values_encode_as_null() {
        let update = SequenceUpdate {
            run_id: "r".to_string(),
            chain_id: "c".to_string(),
            variable_name: "v".to_string(),
            position: 0,
            data: vec![f64::NAN, 0.5],
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["data"], json!([null, 0.5]));
    }

    #[test]
    fn test_probe_response_omits_proxy_when_unset() {
        let response = MonitorResponse::ProbeResponse {
            protocol_version: PROTOCOL_VERSION.to_string(),
            proxy: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"type": "probeResponse", "protocolVersion": "0.1.3"})
        );
    }
}
