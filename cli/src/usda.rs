use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;

use larder_core::config::SourceConfig;
use larder_core::error::ImportError;
use larder_core::import::FoodSource;
use larder_core::usda::{FoodDetails, SearchFood, SearchResponse};

/// Blocking client for FoodData Central.
///
/// Owns a current-thread runtime so the synchronous importer can drive
/// reqwest without running inside an async context itself.
pub struct UsdaClient {
    client: reqwest::Client,
    rt: tokio::runtime::Runtime,
    config: SourceConfig,
}

impl UsdaClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "larder/{} (USDA food importer)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        Ok(Self {
            client,
            rt,
            config: config.clone(),
        })
    }

    async fn search_raw(&self, query: &str, page: u32, page_size: u32) -> Result<reqwest::Response> {
        let api_key = self.config.validate()?;
        let page = page.to_string();
        let page_size = page_size.to_string();
        let resp = self
            .client
            .get(self.config.search_url())
            .query(&[
                ("query", query),
                ("pageNumber", page.as_str()),
                ("pageSize", page_size.as_str()),
                ("api_key", api_key),
            ])
            .send()
            .await
            .context("Failed to reach FoodData Central")?
            .error_for_status()
            .context("FoodData Central rejected the search")?;
        Ok(resp)
    }

    pub async fn search_async(&self, query: &str, page: u32, page_size: u32) -> Result<Vec<SearchFood>> {
        let data: SearchResponse = self
            .search_raw(query, page, page_size)
            .await?
            .json()
            .await
            .context("Failed to parse FoodData Central search response")?;
        Ok(data.foods)
    }

    /// One search page exactly as the API returned it.
    pub fn probe(&self, query: &str, page_size: u32) -> Result<serde_json::Value> {
        self.rt.block_on(async {
            self.search_raw(query, 1, page_size)
                .await?
                .json()
                .await
                .context("FoodData Central returned invalid JSON")
        })
    }

    pub async fn food_details_async(&self, fdc_id: i64) -> Result<Option<FoodDetails>> {
        let api_key = self.config.validate()?;
        let resp = self
            .client
            .get(self.config.detail_url(fdc_id))
            .query(&[("api_key", api_key)])
            .send()
            .await
            .context("Failed to reach FoodData Central")?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            bail!("FoodData Central returned {} for food {fdc_id}", resp.status());
        }

        let details: FoodDetails = resp
            .json()
            .await
            .context("Failed to parse FoodData Central food details")?;
        Ok(Some(details))
    }

    pub fn food_details(&self, fdc_id: i64) -> Result<Option<FoodDetails>> {
        self.rt.block_on(self.food_details_async(fdc_id))
    }
}

impl FoodSource for UsdaClient {
    fn search(&self, term: &str, page: u32) -> Result<Vec<SearchFood>, ImportError> {
        self.rt
            .block_on(self.search_async(term, page, self.config.page_size))
            .map_err(|source| ImportError::SourceUnavailable {
                term: term.to_string(),
                source,
            })
    }
}
