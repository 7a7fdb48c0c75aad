use std::future::Future;
use std::time::Duration;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use crate::error::{ConvError, ConvResult};

/// Uploader as reported by the metadata API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Owner {
    pub mid: i64,
    pub name: String,
}

/// The part of the video info body we read
#[derive(Debug, Clone, Deserialize)]
struct VideoInfoResponse {
    /// Absent when the video was removed upstream
    #[serde(default)]
    owner: Option<Owner>,
}

/// Source of uploader metadata for an asset id.
///
/// `Ok(None)` means the asset no longer exists upstream.
pub trait MetadataSource {
    fn fetch_owner(&self, aid: i64) -> impl Future<Output = ConvResult<Option<Owner>>>;
}

/// HTTP client for the video info endpoint
#[derive(Debug, Clone)]
pub struct VideoInfoClient {
    client: Client,
    endpoint: String,
}

impl VideoInfoClient {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> ConvResult<Self> {
        let endpoint = endpoint.into();
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ConvError::MetadataFetch {
            aid: 0,
            reason: format!("failed to build HTTP client for {}: {}", endpoint, e),
        })?;
        Ok(Self { client, endpoint })
    }
}

impl MetadataSource for VideoInfoClient {
    async fn fetch_owner(&self, aid: i64) -> ConvResult<Option<Owner>> {
        let fetch_error = |reason: String| ConvError::MetadataFetch { aid, reason };

        info!("request for {}", aid);
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("aid", aid)])
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_error(e.to_string()))?;

        let body: serde_json::Value = resp.json().await.map_err(|e| fetch_error(e.to_string()))?;
        debug!("get resp: {}", body);

        let info: VideoInfoResponse =
            serde_json::from_value(body).map_err(|e| fetch_error(e.to_string()))?;
        Ok(info.owner)
    }
}
