use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slotwise_core::config::HttpChannelConfig;
use tracing::{debug, warn};

use crate::channel::PersistenceChannel;
use crate::error::{Result, SyncError};

/// Channel stored by a remote host's agent data API.
///
/// `GET  {base}/agents/{agent}/channels/{name}/aggregate` returns
/// `{"aggregate": {"payload": <document>}}` and `POST` to the same URL
/// with `{"payload": <document>}` replaces it. A 404 means nothing is stored.
pub struct HttpChannel {
    client: reqwest::Client,
    name: String,
    url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct AggregateEnvelope {
    aggregate: Option<Aggregate>,
}

#[derive(Deserialize)]
struct Aggregate {
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Serialize)]
struct SaveBody<'a> {
    payload: &'a serde_json::Value,
}

impl HttpChannel {
    pub fn new(name: impl Into<String>, config: &HttpChannelConfig) -> Result<Self> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let url = format!(
            "{}/agents/{}/channels/{}/aggregate",
            config.base_url.trim_end_matches('/'),
            config.agent_id,
            name
        );
        Ok(Self {
            client,
            name,
            url,
            token: config.token.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl PersistenceChannel for HttpChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Option<serde_json::Value>> {
        debug!(url = %self.url, "loading channel document");
        let resp = self.authorize(self.client.get(&self.url)).send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "channel load rejected");
            return Err(SyncError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let envelope: AggregateEnvelope = resp
            .json()
            .await
            .map_err(|e| SyncError::Decode(format!("unexpected aggregate body: {e}")))?;
        Ok(envelope
            .aggregate
            .map(|a| a.payload)
            .filter(|payload| !payload.is_null()))
    }

    async fn save(&self, document: &serde_json::Value) -> Result<()> {
        let resp = self
            .authorize(self.client.post(&self.url))
            .json(&SaveBody { payload: document })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "channel save rejected");
            return Err(SyncError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }
        debug!(url = %self.url, "channel document saved");
        Ok(())
    }
}
