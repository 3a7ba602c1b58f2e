use serde::{Deserialize, Serialize};

use crate::nutrients::{Nutrient, NutrientMap};

pub const NAME_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const BRAND_MAX_CHARS: usize = 200;

pub const USDA_DATA_SOURCE: &str = "USDA";
/// FDC search results report nutrients per 100 g.
pub const DEFAULT_SERVING_SIZE: &str = "100g";
pub const DEFAULT_SERVING_WEIGHT_G: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub food_id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub brand: Option<String>,
    pub serving_size: String,
    pub serving_weight_g: f64,
    pub data_source: String,
    pub is_verified: bool,
    pub fdc_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_run: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NutritionFacts {
    pub food_id: i64,
    pub values: NutrientMap,
}

impl NutritionFacts {
    #[must_use]
    pub fn get(&self, nutrient: Nutrient) -> Option<f64> {
        self.values.get(&nutrient).copied()
    }
}

/// A source item translated into this store's vocabulary, not yet persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedFood {
    pub name: String,
    pub description: String,
    pub brand: Option<String>,
    pub fdc_id: Option<i64>,
    pub nutrition: NutrientMap,
}

impl ParsedFood {
    #[must_use]
    pub fn calories(&self) -> Option<f64> {
        self.nutrition.get(&Nutrient::Calories).copied()
    }
}

/// Result of persisting one [`ParsedFood`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrittenFood {
    pub food_id: i64,
    /// False when calories were missing or the nutrition insert failed.
    pub nutrition_recorded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub food_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodSample {
    pub food_id: i64,
    pub name: String,
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub food_count: i64,
    pub nutrition_count: i64,
    pub categories: Vec<CategoryCount>,
    pub samples: Vec<FoodSample>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ClearSummary {
    pub nutrition_facts_deleted: usize,
    pub foods_deleted: usize,
    pub categories_deleted: usize,
}

/// Cut `s` to at most `max` characters without splitting a code point.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
