//! Wire types for the USDA FoodData Central API and their translation into
//! [`ParsedFood`].

use serde::{Deserialize, Serialize};

use crate::config::BrandSource;
use crate::models::ParsedFood;
use crate::nutrients::map_nutrients;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub foods: Vec<SearchFood>,
    pub total_hits: Option<u64>,
    pub current_page: Option<u32>,
    pub total_pages: Option<u32>,
}

/// One item of a `/foods/search` page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFood {
    pub fdc_id: Option<i64>,
    #[serde(default)]
    pub description: String,
    pub data_type: Option<String>,
    pub brand_name: Option<String>,
    pub brand_owner: Option<String>,
    #[serde(default)]
    pub food_nutrients: Vec<SearchNutrient>,
}

/// Search results flatten the nutrient: `nutrientId` sits beside `value`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchNutrient {
    pub nutrient_id: Option<u32>,
    pub nutrient_name: Option<String>,
    pub unit_name: Option<String>,
    pub value: Option<f64>,
}

/// Response of `/food/{fdcId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodDetails {
    pub fdc_id: Option<i64>,
    #[serde(default)]
    pub description: String,
    pub data_type: Option<String>,
    pub brand_name: Option<String>,
    pub brand_owner: Option<String>,
    #[serde(default)]
    pub food_nutrients: Vec<DetailNutrient>,
}

/// Detail responses nest the nutrient and call the value `amount`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailNutrient {
    pub nutrient: Option<NutrientInfo>,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutrientInfo {
    pub id: Option<u32>,
    pub name: Option<String>,
    pub unit_name: Option<String>,
}

fn brand(source: BrandSource, name: Option<&String>, owner: Option<&String>) -> Option<String> {
    let owner = match source {
        BrandSource::BrandName => None,
        BrandSource::BrandNameOrOwner => owner,
    };
    [name, owner]
        .into_iter()
        .flatten()
        .map(|b| b.trim())
        .find(|b| !b.is_empty())
        .map(str::to_string)
}

#[must_use]
pub fn parse_search_food(food: &SearchFood, brand_source: BrandSource) -> ParsedFood {
    let nutrition = map_nutrients(
        food.food_nutrients
            .iter()
            .map(|n| (n.nutrient_id, n.value)),
    );
    ParsedFood {
        name: food.description.clone(),
        description: food.description.clone(),
        brand: brand(brand_source, food.brand_name.as_ref(), food.brand_owner.as_ref()),
        fdc_id: food.fdc_id,
        nutrition,
    }
}

#[must_use]
pub fn parse_food_details(details: &FoodDetails, brand_source: BrandSource) -> ParsedFood {
    let nutrition = map_nutrients(
        details
            .food_nutrients
            .iter()
            .map(|n| (n.nutrient.as_ref().and_then(|info| info.id), n.amount)),
    );
    ParsedFood {
        name: details.description.clone(),
        description: details.description.clone(),
        brand: brand(
            brand_source,
            details.brand_name.as_ref(),
            details.brand_owner.as_ref(),
        ),
        fdc_id: details.fdc_id,
        nutrition,
    }
}
