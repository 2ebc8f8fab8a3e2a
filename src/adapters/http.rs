use crate::domain::model::{RawRecord, RawRecordSet};
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Fetches a JSON array of objects with a single GET request.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &str, timeout: Option<Duration>) -> Result<RawRecordSet> {
        let unavailable = |reason: String| EtlError::SourceUnavailable {
            origin: url.to_string(),
            reason,
        };

        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!("Making API request to: {}", url);
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                unavailable(format!("request timed out: {}", e))
            } else {
                unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);
        if !status.is_success() {
            return Err(unavailable(format!("HTTP status {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| unavailable(format!("failed to read response body: {}", e)))?;

        parse_json_records(url, &body)
    }
}

/// Parses a payload that must be a JSON array of JSON objects.
pub fn parse_json_records(origin: &str, body: &[u8]) -> Result<RawRecordSet> {
    let malformed = |reason: String| EtlError::SourceMalformed {
        origin: origin.to_string(),
        reason,
    };

    let json_data: Value =
        serde_json::from_slice(body).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;

    let Value::Array(items) = json_data else {
        return Err(malformed("expected a JSON array of records".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(obj) => Ok(RawRecord::new(obj)),
            other => Err(malformed(format!(
                "element {} is not an object: {}",
                index, other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array_of_objects() {
        let body = br#"[{"id": 1, "name": "Ann", "address": {"city": "X"}}, {"id": 2}]"#;
        let records = parse_json_records("mem://users", body).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data["name"], "Ann");
        assert_eq!(records[0].data["address"]["city"], "X");
        // 保留原始欄位順序
        let keys: Vec<&String> = records[0].data.keys().collect();
        assert_eq!(keys, vec!["id", "name", "address"]);
    }

    #[test]
    fn test_parse_rejects_non_array_payloads() {
        for body in [&br#"{"id": 1}"#[..], b"[1, 2]", b"not json"] {
            let err = parse_json_records("mem://bad", body).unwrap_err();
            assert!(matches!(err, EtlError::SourceMalformed { .. }), "{:?}", err);
        }
    }
}
