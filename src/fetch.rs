//! Upstream image retrieval.

use crate::origin::OriginEntry;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
	#[error("Error getting image: {0}")]
	Transport(#[from] reqwest::Error),
	#[error("Source returned a status code other than 200: {0}")]
	BadStatus(u16),
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
	async fn fetch(&self, origin: &OriginEntry, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches images over plain HTTP(S) via `reqwest`. S3 buckets and CDN
/// origins alike are just a GET away — no signing or auth is in scope here.
pub struct ReqwestFetcher {
	client: reqwest::Client,
}

impl ReqwestFetcher {
	pub fn new() -> Self {
		Self { client: reqwest::Client::new() }
	}
}

impl Default for ReqwestFetcher {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
	async fn fetch(&self, origin: &OriginEntry, path: &str) -> Result<Vec<u8>, FetchError> {
		let url = format!("{}{}", origin.base_url(), path);
		let response = self.client.get(&url).send().await?;
		if !response.status().is_success() {
			return Err(FetchError::BadStatus(response.status().as_u16()));
		}
		Ok(response.bytes().await?.to_vec())
	}
}
