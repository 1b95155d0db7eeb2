//! Client for the external intent-extraction service.
//!
//! The service is a black box: transcript in, loosely-typed action list
//! out. Responses go through the same lenient normalization as any other
//! upstream payload, so shape drift degrades to `UNKNOWN` actions instead
//! of failing the command.

use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::intent::{actions_from_value, Action};

pub trait IntentService {
    fn extract(&self, transcript: &str) -> Result<Vec<Action>>;
}

pub struct HttpIntentService {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpIntentService {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

impl IntentService for HttpIntentService {
    fn extract(&self, transcript: &str) -> Result<Vec<Action>> {
        if transcript.trim().is_empty() {
            return Ok(vec![Action::Unknown]);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "transcript": transcript }))
            .send()
            .with_context(|| format!("Intent service request to {} failed", self.endpoint))?
            .error_for_status()
            .context("Intent service returned an error status")?;

        let value: Value = response
            .json()
            .context("Intent service returned a non-JSON body")?;
        let actions = actions_from_value(&value);
        debug!(count = actions.len(), "intent service returned actions");
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedIntentService(Value);

    impl IntentService for CannedIntentService {
        fn extract(&self, _transcript: &str) -> Result<Vec<Action>> {
            Ok(actions_from_value(&self.0))
        }
    }

    #[test]
    fn test_canned_service_normalizes() {
        let service = CannedIntentService(serde_json::json!({"type": "DELETE_ALL"}));
        let actions = service.extract("clear everything").unwrap();
        assert_eq!(actions, vec![Action::DeleteAll]);
    }

    #[test]
    fn test_empty_transcript_short_circuits() {
        let service = HttpIntentService::new("http://localhost:1/never-called").unwrap();
        let actions = service.extract("   ").unwrap();
        assert_eq!(actions, vec![Action::Unknown]);
    }
}
