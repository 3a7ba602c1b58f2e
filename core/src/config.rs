use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";
pub const PLACEHOLDER_API_KEY: &str = "YOUR_USDA_API_KEY_HERE";

/// Popular single-word searches used by the quick preset.
pub const QUICK_TERMS: [&str; 10] = [
    "chicken",
    "rice",
    "bread",
    "apple",
    "banana",
    "milk",
    "eggs",
    "fish",
    "vegetables",
    "pasta",
];

/// Category names searched by the full preset.
pub const FULL_CATEGORIES: [&str; 14] = [
    "Vegetables",
    "Fruits",
    "Grains & Cereals",
    "Meat & Poultry",
    "Fish & Seafood",
    "Dairy & Eggs",
    "Nuts & Seeds",
    "Oils & Fats",
    "Beverages",
    "Condiments & Sauces",
    "Snacks",
    "Desserts",
    "Prepared Foods",
    "Fast Food",
];

/// Everything an [`Importer`](crate::import::Importer) needs besides its
/// collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub brand: BrandSource,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: 100,
            timeout_secs: 10,
            connect_timeout_secs: 5,
            brand: BrandSource::BrandName,
        }
    }
}

impl SourceConfig {
    /// The configured key, or [`ImportError::MissingCredential`] when it is
    /// absent, blank, or still the placeholder.
    pub fn validate(&self) -> Result<&str, ImportError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && key != PLACEHOLDER_API_KEY => Ok(key),
            _ => Err(ImportError::MissingCredential),
        }
    }

    #[must_use]
    pub fn search_url(&self) -> String {
        format!("{}/foods/search", self.base_url.trim_end_matches('/'))
    }

    #[must_use]
    pub fn detail_url(&self, fdc_id: i64) -> String {
        format!("{}/food/{fdc_id}", self.base_url.trim_end_matches('/'))
    }
}

/// Which FDC fields fill `foods.brand`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrandSource {
    #[default]
    BrandName,
    /// `brandName`, or `brandOwner` when the name is missing or blank.
    BrandNameOrOwner,
}

/// What to do when an item's FDC id is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Insert again; every run adds its own rows.
    #[default]
    Allow,
    SkipExisting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub search_terms: Vec<String>,
    pub max_per_category: usize,
    pub page: u32,
    pub batch_size: usize,
    pub item_delay_ms: u64,
    pub connect_attempts: u32,
    pub connect_delay_ms: u64,
    pub max_reconnects: u32,
    pub duplicates: DuplicatePolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            search_terms: Vec::new(),
            max_per_category: 1000,
            page: 1,
            batch_size: 20,
            item_delay_ms: 50,
            connect_attempts: 3,
            connect_delay_ms: 2000,
            max_reconnects: 5,
            duplicates: DuplicatePolicy::Allow,
        }
    }
}

impl ImportConfig {
    #[must_use]
    pub fn connect_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.connect_attempts,
            Duration::from_millis(self.connect_delay_ms),
        )
    }

    #[must_use]
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    /// Batch size, never zero.
    #[must_use]
    pub fn commit_every(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        self.search_terms = preset.terms();
        self.max_per_category = preset.max_per_category();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Ten popular searches, 500 foods each.
    Quick,
    /// Every category, 1000 foods each.
    Full,
}

impl Preset {
    #[must_use]
    pub fn terms(self) -> Vec<String> {
        match self {
            Preset::Quick => QUICK_TERMS.iter().map(ToString::to_string).collect(),
            Preset::Full => FULL_CATEGORIES.iter().map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn max_per_category(self) -> usize {
        match self {
            Preset::Quick => 500,
            Preset::Full => 1000,
        }
    }
}
