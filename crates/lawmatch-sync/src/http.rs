//! HTTP client for the statute registry feed.

use chrono::{DateTime, SecondsFormat, Utc};
use lawmatch_core::{AmendmentFact, FeedBatch, OrdinanceFact, ParentLawFact};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::SyncError;

/// The feed answers either with a bare array or with `{"data": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> Payload<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}

/// Client for the feed's read endpoints.
pub struct FeedClient {
    client: reqwest::Client,
    base_url: String,
}

impl FeedClient {
    /// `base_url` like `http://localhost:8080`; a trailing slash is dropped.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn amendments_url(&self, since: Option<DateTime<Utc>>) -> String {
        let mut url = format!("{}/api/amendments", self.base_url);
        if let Some(ts) = since {
            url.push_str(&format!(
                "?since={}",
                ts.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        url
    }

    /// Pull detected changes, optionally only those detected after `since`.
    pub async fn pull_amendments(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AmendmentFact>, SyncError> {
        self.get(&self.amendments_url(since)).await
    }

    pub async fn pull_parent_laws(&self) -> Result<Vec<ParentLawFact>, SyncError> {
        self.get(&format!("{}/api/parent-laws", self.base_url)).await
    }

    pub async fn pull_ordinances(&self) -> Result<Vec<OrdinanceFact>, SyncError> {
        self.get(&format!("{}/api/ordinances", self.base_url)).await
    }

    /// Pull all three endpoints into one batch ready for ingest.
    pub async fn pull_batch(&self, since: Option<DateTime<Utc>>) -> Result<FeedBatch, SyncError> {
        Ok(FeedBatch {
            ordinances: self.pull_ordinances().await?,
            parent_laws: self.pull_parent_laws().await?,
            amendments: self.pull_amendments(since).await?,
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, SyncError> {
        info!(url = %url, "pulling from statute feed");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let items = decode::<T>(&body)?;
        info!(url = %url, count = items.len(), "pulled");
        Ok(items)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, SyncError> {
    let payload: Payload<T> = serde_json::from_str(body)?;
    Ok(payload.into_items())
}
