//! Elasticsearch-compatible search index sink
//!
//! Talks plain HTTP/JSON: index provisioning with an explicit mapping,
//! HEAD-based existence checks, `_create` single writes (HTTP 409 maps to a
//! duplicate, not a failure), and NDJSON `_bulk` writes with per-item result
//! parsing.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{BulkReport, SceneSink, WriteOutcome};
use crate::error::{Result, SyncError};
use crate::record::SceneRecord;

/// Search index sink over the Elasticsearch HTTP API.
pub struct ElasticSink {
    client: Client,
    base_url: String,
    index: String,
}

impl ElasticSink {
    /// Create a sink for one index.
    ///
    /// `timeout_secs` bounds every request; an elapsed deadline surfaces as
    /// [`SyncError::SinkTimeout`], which is fatal to the run.
    pub fn new(base_url: &str, index: &str, timeout_secs: u64) -> Result<Self> {
        if index.is_empty() {
            return Err(SyncError::Config("index name cannot be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("scenesync/0.1")
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
        })
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index)
    }

    /// Explicit mapping for the scene index.
    ///
    /// The identity key is a keyword so exact-match lookups and duplicate
    /// detection never go through analysis; the footprint is a geo_shape.
    fn index_mapping() -> Value {
        json!({
            "mappings": {
                "properties": {
                    "sceneID": { "type": "keyword" },
                    "sensor": { "type": "text" },
                    "receivingStation": { "type": "text" },
                    "dayOrNight": { "type": "keyword" },
                    "row": { "type": "integer" },
                    "path": { "type": "integer" },
                    "sunAzimuth": { "type": "float" },
                    "sunElevation": { "type": "float" },
                    "cloudCoverFull": { "type": "float" },
                    "sceneStartTime": { "type": "date" },
                    "sceneStopTime": { "type": "date" },
                    "acquisitionDate": { "type": "date" },
                    "dateUpdated": { "type": "date" },
                    "boundingBox": { "type": "geo_shape" }
                }
            }
        })
    }
}

#[async_trait]
impl SceneSink for ElasticSink {
    async fn ensure_target(&self) -> Result<()> {
        let response = self
            .client
            .head(self.index_url())
            .send()
            .await
            .map_err(SyncError::from_sink_http)?;

        if response.status().is_success() {
            debug!(index = %self.index, "index already exists");
            return Ok(());
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(SyncError::SinkUnavailable(format!(
                "index check for '{}' returned {}",
                self.index,
                response.status()
            )));
        }

        info!(index = %self.index, "creating index with scene mapping");
        let response = self
            .client
            .put(self.index_url())
            .json(&Self::index_mapping())
            .send()
            .await
            .map_err(SyncError::from_sink_http)?;

        if !response.status().is_success() {
            return Err(SyncError::SinkUnavailable(format!(
                "index creation for '{}' returned {}",
                self.index,
                response.status()
            )));
        }

        Ok(())
    }

    async fn exists(&self, scene_id: &str) -> Result<bool> {
        let url = format!("{}/_doc/{}", self.index_url(), scene_id);
        let response = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(SyncError::from_sink_http)?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(SyncError::SinkUnavailable(format!(
                "existence check for '{}' returned {}",
                scene_id, status
            ))),
        }
    }

    async fn write_one(&self, record: &SceneRecord) -> Result<WriteOutcome> {
        let url = format!("{}/_create/{}", self.index_url(), record.scene_id());
        let response = self
            .client
            .put(&url)
            .json(record.document())
            .send()
            .await
            .map_err(SyncError::from_sink_http)?;

        match response.status() {
            status if status.is_success() => Ok(WriteOutcome::Created),
            StatusCode::CONFLICT => Ok(WriteOutcome::Duplicate),
            status => Err(SyncError::SinkUnavailable(format!(
                "write for '{}' returned {}",
                record.scene_id(),
                status
            ))),
        }
    }

    async fn write_bulk(&self, records: &[SceneRecord]) -> Result<BulkReport> {
        let mut body = String::new();
        for record in records {
            let action = json!({ "create": { "_index": self.index, "_id": record.scene_id() } });
            body.push_str(&serde_json::to_string(&action)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(record.document())?);
            body.push('\n');
        }

        let response = self
            .client
            .post(format!("{}/_bulk", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(SyncError::from_sink_http)?;

        if !response.status().is_success() {
            return Err(SyncError::SinkUnavailable(format!(
                "bulk write of {} records returned {}",
                records.len(),
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(SyncError::from_sink_http)?;

        let mut report = BulkReport {
            attempted: records.len(),
            ..BulkReport::default()
        };

        if let Some(items) = payload.get("items").and_then(Value::as_array) {
            for item in items {
                let created = item.get("create").unwrap_or(&Value::Null);
                let status = created
                    .get("status")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);

                if status == StatusCode::CONFLICT.as_u16() as u64 {
                    report.conflicts += 1;
                } else if status >= 400 {
                    let reason = created
                        .pointer("/error/reason")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown");
                    warn!(
                        id = created.get("_id").and_then(serde_json::Value::as_str).unwrap_or(""),
                        status, reason, "bulk item rejected"
                    );
                    report.rejected += 1;
                }
            }
        }

        Ok(report)
    }
}
