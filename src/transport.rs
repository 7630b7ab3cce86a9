use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt::Display;

/// The one HTTP call the client makes. Hands back the status and the raw body.
///
/// Implemented for [`reqwest::Client`]; swap in your own to stub out the network.
/// Errors end up in [`crate::LookupError`] messages, so keep the URL (and its key) out of them.
#[async_trait]
pub trait Transport: Send + Sync {
    type Error: Display + Send;

    async fn get(&self, url: &str) -> Result<(StatusCode, String), Self::Error>;
}

#[async_trait]
impl Transport for reqwest::Client {
    type Error = reqwest::Error;

    async fn get(&self, url: &str) -> Result<(StatusCode, String), Self::Error> {
        let response = reqwest::Client::get(self, url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let body = response.text().await.map_err(reqwest::Error::without_url)?;
        Ok((status, body))
    }
}
