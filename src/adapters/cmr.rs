//! Common Metadata Repository granule lookups.

use crate::adapters::{build_client, ensure_success};
use crate::config::settings::CmrSettings;
use crate::core::geo::{spatial_param, temporal_param};
use crate::domain::model::GeoPolygon;
use crate::utils::error::{IngestError, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const HITS_HEADER: &str = "CMR-Hits";
pub const SCROLL_ID_HEADER: &str = "CMR-Scroll-Id";

/// Parameters of a scrolling granule search. The procedures only look granules
/// up by UR; scroll searches are library API for ad-hoc collection queries.
#[derive(Debug, Clone, Default)]
pub struct GranuleQuery {
    pub short_name: String,
    pub starttime: Option<String>,
    pub endtime: Option<String>,
    pub polygon: Option<GeoPolygon>,
}

#[derive(Debug, Clone)]
pub struct CmrClient {
    client: Client,
    base_url: String,
    provider: String,
    retry_attempts: u32,
    retry_delay: Duration,
    page_size: u32,
}

fn feed_entries(body: &Value) -> Vec<Value> {
    body.pointer("/feed/entry")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

impl CmrClient {
    pub fn new(settings: &CmrSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(Some(settings.timeout_seconds), false)?,
            base_url: settings.url.trim_end_matches('/').to_string(),
            provider: settings.provider.clone(),
            retry_attempts: settings.retry_attempts.max(1),
            retry_delay: Duration::from_secs(settings.retry_delay_seconds),
            page_size: settings.page_size,
        })
    }

    fn granules_endpoint(&self) -> String {
        format!("{}/search/granules.json", self.base_url)
    }

    fn parse_url(&self, raw: &str) -> Result<Url> {
        Url::parse(raw).map_err(|e| IngestError::InvalidConfigValueError {
            field: "cmr.url".to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
    }

    /// First granule matching a granule UR, retrying timeouts.
    pub async fn granule_by_ur(&self, granule_ur: &str) -> Result<Option<Value>> {
        let url = Url::parse_with_params(
            &self.granules_endpoint(),
            &[("granule_ur", granule_ur), ("provider-id", self.provider.as_str())],
        )
        .map_err(|e| IngestError::InvalidConfigValueError {
            field: "cmr.url".to_string(),
            value: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_json(&url).await {
                Ok(body) => return Ok(body.pointer("/feed/entry/0").cloned()),
                // 讀取 body 時逾時也要重試
                Err(IngestError::HttpError(e)) if e.is_timeout() && attempt < self.retry_attempts => {
                    tracing::warn!(
                        "CMR timeout on attempt {}/{} for {}",
                        attempt,
                        self.retry_attempts,
                        granule_ur
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_json(&self, url: &Url) -> Result<Value> {
        let response = ensure_success(self.client.get(url.clone()).send().await?, "CMR")?;
        tracing::info!("CMR URL: {} returned status code: {}", url, response.status());
        Ok(response.json().await?)
    }

    /// Scroll-enabled search URL with temporal and spatial constraints.
    pub fn search_url(&self, query: &GranuleQuery) -> Result<String> {
        let base = Url::parse_with_params(
            &self.granules_endpoint(),
            &[
                ("short_name", query.short_name.clone()),
                ("scroll", "true".to_string()),
                ("page_size", self.page_size.to_string()),
            ],
        )
        .map_err(|e| IngestError::InvalidConfigValueError {
            field: "cmr.url".to_string(),
            value: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(format!(
            "{}{}{}",
            base,
            temporal_param(query.starttime.as_deref(), query.endtime.as_deref())?,
            spatial_param(query.polygon.as_ref())
        ))
    }

    /// Follows the scroll id until every page reported by `CMR-Hits` is read.
    ///
    /// Library API: no binary runs a scroll search.
    pub async fn search(&self, query_url: &str) -> Result<Vec<Value>> {
        let url = self.parse_url(query_url)?;
        let response = ensure_success(self.client.get(url.clone()).send().await?, "CMR")?;

        let total: usize = response
            .headers()
            .get(HITS_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| IngestError::processing("CMR response has no CMR-Hits header"))?;
        let scroll_id = response
            .headers()
            .get(SCROLL_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut granules = feed_entries(&response.json().await?);
        if granules.is_empty() {
            tracing::info!("no granules returned");
            return Ok(granules);
        }

        let pages = total.div_ceil(granules.len());
        tracing::debug!("total granules matching query: {} over {} pages", total, pages);

        for page in 1..pages {
            tracing::debug!("querying page {}", page + 1);
            let mut request = self.client.get(url.clone());
            if let Some(id) = &scroll_id {
                request = request.header(SCROLL_ID_HEADER, id);
            }
            let response = ensure_success(request.send().await?, "CMR")?;
            let entries = feed_entries(&response.json().await?);
            if entries.is_empty() {
                break;
            }
            granules.extend(entries);
        }

        if granules.len() != total {
            return Err(IngestError::processing(format!(
                "Total granules returned from query ({}) do not match expected granule count ({})",
                granules.len(),
                total
            )));
        }
        tracing::info!("query returned {} total granules", granules.len());
        Ok(granules)
    }
}
