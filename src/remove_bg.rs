//! # Background Removal Module
//!
//! Client for the remove.bg HTTP API. One call per image, no retries.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::errors::RemovalError;

/// Removes the background of an image
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Submit raw image bytes, get the processed PNG bytes back
    async fn remove_background(&self, image: Vec<u8>) -> Result<Vec<u8>, RemovalError>;
}

pub struct RemoveBgClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl RemoveBgClient {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl BackgroundRemover for RemoveBgClient {
    async fn remove_background(&self, image: Vec<u8>) -> Result<Vec<u8>, RemovalError> {
        let image_size = image.len();
        debug!(image_size, "Calling remove.bg API");

        let form = Form::new()
            .part("image_file", Part::bytes(image).file_name("image.jpg"))
            .text("size", "auto");

        let response = self
            .client
            .post(&self.api_url)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let err = RemovalError::from(e);
                match &err {
                    RemovalError::Timeout(_) => warn!(error = %err, "remove.bg API timed out"),
                    _ => error!(error = %err, "remove.bg API request failed"),
                }
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "remove.bg API rejected the image");
            return Err(RemovalError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let processed = response.bytes().await?.to_vec();
        info!(
            image_size,
            processed_size = processed.len(),
            "Background removed successfully"
        );
        Ok(processed)
    }
}
