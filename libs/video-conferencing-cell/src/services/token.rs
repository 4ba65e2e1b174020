// libs/video-conferencing-cell/src/services/token.rs
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, instrument};

use shared_backend::BackendClient;
use shared_config::AppConfig;

use crate::models::VideoCredentials;

/// Source of per-join video credentials. Every call fetches a fresh token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoTokenProvider: Send + Sync {
    async fn fetch_credentials(&self, appointment_id: i64) -> Result<VideoCredentials>;
}

/// Token endpoint of the clinic backend.
pub struct HttpVideoTokenClient {
    client: BackendClient,
    access_token: Option<String>,
}

impl HttpVideoTokenClient {
    pub fn new(config: &AppConfig, access_token: Option<String>) -> Self {
        Self {
            client: BackendClient::new(config),
            access_token,
        }
    }
}

#[async_trait]
impl VideoTokenProvider for HttpVideoTokenClient {
    #[instrument(skip(self))]
    async fn fetch_credentials(&self, appointment_id: i64) -> Result<VideoCredentials> {
        let path = format!("/api/v1/appointments/{}/video-token", appointment_id);
        let credentials: VideoCredentials = self
            .client
            .get(&path, self.access_token.as_deref())
            .await?;

        debug!("Fetched video credentials for channel {}", credentials.channel_name);
        Ok(credentials)
    }
}
