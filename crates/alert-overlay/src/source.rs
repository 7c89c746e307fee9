//! Tile sources: where alert tile bytes come from.

use std::time::Duration;

use alert_common::{AlertError, AlertResult, TileCoord};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::URL_PLACEHOLDERS;
use crate::error::FetchError;

/// Trait for anything that can serve encoded alert tiles.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Fetch the PNG bytes of one tile.
    async fn fetch(&self, coord: &TileCoord) -> Result<Bytes, FetchError>;
}

/// HTTP tile origin addressed by a `{z}/{x}/{y}` URL template.
pub struct HttpTileSource {
    client: Client,
    template: String,
}

impl HttpTileSource {
    /// Build a source for `template`. Without a timeout requests wait
    /// indefinitely.
    pub fn new(template: impl Into<String>, timeout: Option<Duration>) -> AlertResult<Self> {
        let template = template.into();
        if let Some(missing) = URL_PLACEHOLDERS.iter().find(|p| !template.contains(**p)) {
            return Err(AlertError::config(
                "tile_url",
                format!("missing {} placeholder", missing),
            ));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AlertError::config("tile_url", format!("HTTP client: {}", e)))?;

        Ok(Self { client, template })
    }

    /// URL for one tile.
    pub fn tile_url(&self, coord: &TileCoord) -> String {
        self.template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    #[instrument(skip(self), fields(tile = %coord.path()))]
    async fn fetch(&self, coord: &TileCoord) -> Result<Bytes, FetchError> {
        let url = self.tile_url(coord);
        debug!(url = %url, "Requesting tile");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        debug!(size = bytes.len(), "Downloaded tile");
        Ok(bytes)
    }
}
