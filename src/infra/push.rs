use anyhow::Result;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;

/// Thin client for the push gateway. When no endpoint is configured the
/// alert is logged and dropped; callers treat dispatch as best-effort
/// either way.
#[derive(Clone)]
pub struct PushClient {
    http: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl PushClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.push_timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.push_endpoint.clone(),
            api_key: config.push_api_key.clone(),
        })
    }

    pub async fn send(
        &self,
        recipient: Uuid,
        title: &str,
        body: &str,
        payload: &Value,
    ) -> Result<()> {
        let Some(endpoint) = &self.endpoint else {
            debug!(%recipient, title, "push endpoint not configured, dropping alert");
            return Ok(());
        };

        let mut request = self.http.post(endpoint).json(&json!({
            "to": recipient,
            "title": title,
            "body": body,
            "data": payload,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        request.send().await?.error_for_status()?;
        Ok(())
    }
}
