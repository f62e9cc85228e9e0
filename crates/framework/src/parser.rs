//! Loaders for the JSON documents describing pods and requests.
//!
//! Pods file format:
//! ```json
//! [
//!   { "name": "vllm-0", "address": "10.0.0.1",
//!     "metrics": { "waitingQueueSize": 3, "kvCacheUsagePercent": 0.4,
//!                  "activeModels": ["sql-lora"], "maxActiveModels": 4 } }
//! ]
//! ```

use crate::error::Result;
use crate::types::{LlmRequest, Pod, PodInfo, PodMetrics};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// On-disk shape of a pod: identity fields inline, metrics nested.
#[derive(Debug, Deserialize)]
struct PodRecord {
    #[serde(flatten)]
    info: PodInfo,
    #[serde(default)]
    metrics: PodMetrics,
}

impl From<PodRecord> for Pod {
    fn from(record: PodRecord) -> Self {
        Pod::new(record.info, record.metrics)
    }
}

/// Parse a JSON array of pods, keeping document order.
pub fn parse_pods(contents: &str) -> Result<Vec<Pod>> {
    let records: Vec<PodRecord> = serde_json::from_str(contents)?;
    Ok(records.into_iter().map(Pod::from).collect())
}

pub fn load_pods(path: &Path) -> Result<Vec<Pod>> {
    let contents = fs::read_to_string(path)?;
    let pods = parse_pods(&contents)?;
    tracing::debug!("Loaded {} pods from {}", pods.len(), path.display());
    Ok(pods)
}

pub fn parse_request(contents: &str) -> Result<LlmRequest> {
    Ok(serde_json::from_str(contents)?)
}

pub fn load_request(path: &Path) -> Result<LlmRequest> {
    let contents = fs::read_to_string(path)?;
    parse_request(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_parse_pods_preserves_order() {
        let pods = parse_pods(
            r#"[
                {"name": "b", "metrics": {"waitingQueueSize": 7}},
                {"name": "a", "namespace": "serving", "address": "10.0.0.2"}
            ]"#,
        )
        .unwrap();

        assert_eq!(pods.len(), 2);
        assert_eq!(pods[0].name(), "b");
        assert_eq!(pods[0].metrics().waiting_queue_size, 7);
        assert_eq!(pods[1].info().namespace, "serving");
        assert_eq!(pods[1].metrics(), &PodMetrics::default());
    }

    #[test]
    fn test_parse_request() {
        let request = parse_request(
            r#"{"requestId": "r-1", "targetModel": "sql-lora", "critical": true}"#,
        )
        .unwrap();

        assert_eq!(request.request_id, "r-1");
        assert_eq!(request.target_model, "sql-lora");
        assert!(request.critical);
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_malformed_document() {
        let result = parse_pods(r#"{"name": "not-an-array"}"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_pods(Path::new("/nonexistent/pods.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
