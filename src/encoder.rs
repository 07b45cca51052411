//! Report encoding
//!
//! Wraps engine results in a JSON envelope carrying producer and timing
//! metadata, so downstream consumers can tell which engine build produced a
//! score.

use crate::error::ComputeError;
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Envelope around any serializable engine result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report<T> {
    /// Version of the engine build that computed `body`
    pub engine_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: DateTime<Utc>,
    pub body: T,
}

/// Encoder producing report envelopes
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap a result in a report envelope
    pub fn encode<'a, T: Serialize>(&self, body: &'a T) -> Report<&'a T> {
        Report {
            engine_version: ENGINE_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now(),
            body,
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json<T: Serialize>(&self, body: &T) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(&self.encode(body)).map_err(ComputeError::JsonError)
    }

    /// Encode to a single-line JSON string (one NDJSON record)
    pub fn encode_to_line<T: Serialize>(&self, body: &T) -> Result<String, ComputeError> {
        serde_json::to_string(&self.encode(body)).map_err(ComputeError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::classify;
    use crate::types::CompositeScore;

    #[test]
    fn test_envelope_fields() {
        let encoder = ReportEncoder::with_instance_id("instance-1".to_string());
        let composite = CompositeScore {
            score: 82,
            band: classify(82),
        };

        let json = encoder.encode_to_json(&composite).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["engine_version"], ENGINE_VERSION);
        assert_eq!(value["producer"]["name"], PRODUCER_NAME);
        assert_eq!(value["producer"]["version"], ENGINE_VERSION);
        assert_eq!(value["producer"]["instance_id"], "instance-1");
        assert_eq!(value["body"]["score"], 82);
        assert_eq!(value["body"]["band"], "optimal");
    }

    #[test]
    fn test_unique_instance_ids() {
        let a = ReportEncoder::new();
        let b = ReportEncoder::new();
        assert_ne!(a.instance_id(), b.instance_id());
    }

    #[test]
    fn test_line_encoding_is_single_line() {
        let encoder = ReportEncoder::new();
        let line = encoder.encode_to_line(&vec![1, 2, 3]).unwrap();
        assert!(!line.contains('\n'));
    }
}
