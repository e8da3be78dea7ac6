use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::FetchError;

pub const SENTINEL1_GRD: &str = "sentinel-1-grd";

/// POST body for a STAC item search.
#[derive(Serialize, Debug, Clone)]
pub struct SearchBody {
    pub collections: Vec<String>,
    /// [min_lon, min_lat, max_lon, max_lat]
    pub bbox: [f64; 4],
    /// "start/end" interval, RFC 3339 endpoints.
    pub datetime: String,
    pub limit: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ItemCollection {
    #[serde(default)]
    pub features: Vec<StacItem>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StacItem {
    pub id: String,
    #[serde(default)]
    pub properties: ItemProperties,
    #[serde(default)]
    pub assets: HashMap<String, StacAsset>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ItemProperties {
    /// Acquisition timestamp, RFC 3339. Some catalogs omit it.
    pub datetime: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StacAsset {
    pub href: String,
}

/// Thin client for a STAC-style search endpoint. Only the parts of the
/// protocol the finder needs: one filtered search per request.
#[derive(Debug, Clone)]
pub struct StacCatalog {
    base_url: String,
    client: reqwest::Client,
}

impl StacCatalog {
    pub fn new(base_url: impl Into<String>) -> StacCatalog {
        StacCatalog {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn search(&self, body: &SearchBody) -> Result<Vec<StacItem>, FetchError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let res = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(FetchError::SearchFailed)?
            .error_for_status()
            .map_err(FetchError::SearchFailed)?;

        let items: ItemCollection = res.json().await.map_err(FetchError::SearchFailed)?;
        log::info!("catalog returned {} Sentinel-1 GRD items", items.features.len());
        Ok(items.features)
    }
}
