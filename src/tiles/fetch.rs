use async_trait::async_trait;

use crate::{prelude::Arc, scene::Bitmap, MapError, Result};

/// User agent sent with tile requests; public tile servers reject anonymous clients
pub const DEFAULT_USER_AGENT: &str = concat!("slippymap/", env!("CARGO_PKG_VERSION"));

/// Source of tile bitmaps
#[async_trait]
pub trait BitmapFetcher: Send + Sync {
    /// Fetches the raw image bytes at `url`
    async fn fetch(&self, url: &str) -> Result<Bitmap>;
}

/// Fetches bitmaps over HTTP. Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BitmapFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bitmap> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(MapError::Fetch(format!(
                "HTTP {} for {}",
                response.status(),
                url
            )));
        }
        let bytes = response.bytes().await?;
        log::trace!("fetched {} ({} bytes)", url, bytes.len());
        Ok(Arc::new(bytes.to_vec()))
    }
}
