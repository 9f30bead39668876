//! Pinata-backed content store
//!
//! Pins uploaded files to IPFS and hands back a gateway URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use super::{ContentStore, RaffleError, Result};

const DEFAULT_API_URL: &str = "https://api.pinata.cloud";
const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud";

/// Content store configuration
#[derive(Debug, Clone)]
pub struct ContentStoreConfig {
    pub api_url: String,
    pub gateway_url: String,
    pub jwt: String,
    pub timeout: Duration,
}

impl ContentStoreConfig {
    /// Read `PINATA_JWT`, `PINATA_API_URL` and `IPFS_GATEWAY_URL`.
    /// Returns `None` when no JWT is configured.
    pub fn from_env() -> Option<Self> {
        let jwt = std::env::var("PINATA_JWT").ok().filter(|v| !v.is_empty())?;
        Some(Self {
            api_url: std::env::var("PINATA_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into()),
            gateway_url: std::env::var("IPFS_GATEWAY_URL")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.into()),
            jwt,
            timeout: Duration::from_secs(30),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Uploads files through Pinata's `pinFileToIPFS` endpoint.
pub struct PinataContentStore {
    client: reqwest::Client,
    config: ContentStoreConfig,
}

impl PinataContentStore {
    pub fn new(config: ContentStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RaffleError::Upload(format!("failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn pin_url(&self) -> String {
        format!(
            "{}/pinning/pinFileToIPFS",
            self.config.api_url.trim_end_matches('/')
        )
    }

    fn gateway_url(&self, hash: &str) -> String {
        format!(
            "{}/ipfs/{}",
            self.config.gateway_url.trim_end_matches('/'),
            hash
        )
    }
}

#[async_trait]
impl ContentStore for PinataContentStore {
    async fn upload(&self, file_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<String> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| RaffleError::Validation(format!("Invalid content type: {}", e)))?;
        let form = Form::new().part("file", part);

        debug!(file_name, size, "Uploading file to IPFS");

        let response = self
            .client
            .post(self.pin_url())
            .bearer_auth(&self.config.jwt)
            .multipart(form)
            .send()
            .await
            .map_err(|e| RaffleError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RaffleError::Upload(format!(
                "pinning failed with status {}: {}",
                status, body
            )));
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| RaffleError::Upload(format!("invalid pinning response: {}", e)))?;

        let url = self.gateway_url(&pinned.ipfs_hash);
        info!(ipfs_hash = %pinned.ipfs_hash, "File pinned");
        Ok(url)
    }
}
