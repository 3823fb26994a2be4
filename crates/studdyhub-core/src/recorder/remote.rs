//! Hosted data store recorder.
//!
//! Inserts rows through a PostgREST-style endpoint
//! (`POST {url}/rest/v1/{table}`), the interface hosted Postgres services
//! expose to client apps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{NewStudySession, SessionRecorder, StudySessionRecord};
use crate::error::{ConfigError, RecorderError};

#[derive(Debug, Clone)]
pub struct RemoteRecorderConfig {
    pub base_url: String,
    pub table: String,
    pub api_key: Option<String>,
}

pub struct RemoteRecorder {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

/// Row as echoed back by the store. Ids may be integers or uuids.
#[derive(Debug, Deserialize)]
struct RemoteRow {
    id: serde_json::Value,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl RemoteRecorder {
    /// # Errors
    /// Returns an error if `base_url` is not a valid URL or `table` is empty.
    pub fn new(config: RemoteRecorderConfig) -> Result<Self, ConfigError> {
        if config.table.is_empty() {
            return Err(ConfigError::MissingKey("backend.table".into()));
        }
        let mut base = Url::parse(&config.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "backend.url".into(),
            message: e.to_string(),
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(&format!("rest/v1/{}", config.table))
            .map_err(|e| ConfigError::InvalidValue {
                key: "backend.table".into(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key: config.api_key.filter(|k| !k.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn parse_representation(
        body: &str,
        session: &NewStudySession,
    ) -> Result<StudySessionRecord, RecorderError> {
        let fallback = |id: String, created_at: Option<DateTime<Utc>>| StudySessionRecord {
            id,
            duration_secs: session.duration_secs,
            focus_level: session.focus_level,
            distractions: session.distractions,
            goal_achieved: session.goal_achieved,
            created_at: created_at.unwrap_or_else(Utc::now),
        };

        // Stores that ignore `Prefer: return=representation` answer 201 with no body.
        if body.trim().is_empty() {
            return Ok(fallback(String::new(), None));
        }

        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| RecorderError::InvalidResponse(e.to_string()))?;
        let row = match value {
            serde_json::Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            serde_json::Value::Array(_) => {
                return Err(RecorderError::InvalidResponse("empty row list".into()))
            }
            other => other,
        };
        let row: RemoteRow = serde_json::from_value(row)
            .map_err(|e| RecorderError::InvalidResponse(e.to_string()))?;

        let id = match row.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(fallback(id, row.created_at))
    }
}

#[async_trait]
impl SessionRecorder for RemoteRecorder {
    fn name(&self) -> &str {
        "remote"
    }

    async fn record_focus_session(
        &self,
        session: &NewStudySession,
    ) -> Result<StudySessionRecord, RecorderError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("Prefer", "return=representation")
            .json(session);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            // The status is the error; a partial body only adds detail.
            let body = resp.text().await.unwrap_or_default();
            return Err(RecorderError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text().await?;

        Self::parse_representation(&body, session)
    }
}
