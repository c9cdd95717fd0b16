//! HTTP source implementations
//!
//! Thin JSON-over-HTTP clients for the two upstreams. Every request runs
//! under the configured bounded timeout; transport and decode failures
//! surface as `SourceError` and are retried by the caller on its next
//! cycle, never here.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use types::events::{
    CommitmentProcessed, EncryptedCommitment, EventKind, OpenedCommitment, ProtocolEvent,
    SettlementTransaction,
};
use types::ids::TxHash;

use crate::sources::{EventSource, SettlementSource, SourceError};

fn build_client(timeout: Duration) -> Result<Client, SourceError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SourceError::Transport(e.to_string()))
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, SourceError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SourceError::Transport(e.to_string()))?
        .error_for_status()
        .map_err(|e| SourceError::Transport(e.to_string()))?;
    response
        .json()
        .await
        .map_err(|e| SourceError::Malformed(e.to_string()))
}

/// Protocol event source speaking JSON over HTTP.
///
/// `GET {base}/events/{table}?from_block={n}` returns an array of event
/// records for that kind.
pub struct HttpEventSource {
    client: Client,
    base_url: String,
}

impl HttpEventSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn events_url(&self, kind: EventKind, from_block: u64) -> String {
        format!(
            "{}/events/{}?from_block={}",
            self.base_url,
            kind.table_name(),
            from_block
        )
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch_events(
        &self,
        kind: EventKind,
        from_block: u64,
    ) -> Result<Vec<ProtocolEvent>, SourceError> {
        let url = self.events_url(kind, from_block);
        let events = match kind {
            EventKind::EncryptedCommitment => {
                let rows: Vec<EncryptedCommitment> = get_json(&self.client, &url).await?;
                rows.into_iter().map(ProtocolEvent::Encrypted).collect()
            }
            EventKind::OpenedCommitment => {
                let rows: Vec<OpenedCommitment> = get_json(&self.client, &url).await?;
                rows.into_iter().map(ProtocolEvent::Opened).collect()
            }
            EventKind::CommitmentProcessed => {
                let rows: Vec<CommitmentProcessed> = get_json(&self.client, &url).await?;
                rows.into_iter().map(ProtocolEvent::Processed).collect()
            }
        };
        Ok(events)
    }
}

/// Settlement-chain source speaking JSON over HTTP.
///
/// `POST {base}/transactions` with `{"hashes": [...]}` returns the known
/// subset as an array of transaction records.
pub struct HttpSettlementSource {
    client: Client,
    base_url: String,
}

impl HttpSettlementSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SettlementSource for HttpSettlementSource {
    async fn fetch_transactions(
        &self,
        hashes: &[TxHash],
    ) -> Result<Vec<SettlementTransaction>, SourceError> {
        let url = format!("{}/transactions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "hashes": hashes }))
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))
    }
}
