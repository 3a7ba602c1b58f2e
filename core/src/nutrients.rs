//! FoodData Central nutrient codes and the canonical nutrients they map onto.
//!
//! The code table is a whitelist: codes that are not listed are dropped by
//! [`map_nutrients`], never stored under a guessed name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Calories,
    Protein,
    Fat,
    Carbohydrates,
    Fiber,
    Sugars,
    Cholesterol,
    Sodium,
    Potassium,
    Calcium,
    Iron,
    Magnesium,
    Phosphorus,
    Zinc,
    VitaminA,
    VitaminC,
    VitaminD,
    VitaminB12,
    Folate,
}

/// Canonical nutrient values keyed by nutrient; absent keys are unknown.
pub type NutrientMap = BTreeMap<Nutrient, f64>;

/// FDC nutrient number → canonical nutrient.
pub const NUTRIENT_CODES: [(u32, Nutrient); 19] = [
    (1003, Nutrient::Protein),
    (1004, Nutrient::Fat),
    (1005, Nutrient::Carbohydrates),
    (1008, Nutrient::Calories),
    (1079, Nutrient::Fiber),
    (1089, Nutrient::Sugars),
    (1106, Nutrient::VitaminA),
    (1109, Nutrient::VitaminC),
    (1114, Nutrient::VitaminD),
    (1191, Nutrient::VitaminB12),
    (1175, Nutrient::Folate),
    (1253, Nutrient::Cholesterol),
    (1258, Nutrient::Sodium),
    (1259, Nutrient::Potassium),
    (1095, Nutrient::Calcium),
    (1096, Nutrient::Iron),
    (1097, Nutrient::Magnesium),
    (1098, Nutrient::Phosphorus),
    (1100, Nutrient::Zinc),
];

impl Nutrient {
    /// Column order of the `nutrition_facts` table.
    pub const ALL: [Nutrient; 19] = [
        Nutrient::Calories,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Carbohydrates,
        Nutrient::Fiber,
        Nutrient::Sugars,
        Nutrient::Cholesterol,
        Nutrient::Sodium,
        Nutrient::Potassium,
        Nutrient::Calcium,
        Nutrient::Iron,
        Nutrient::Magnesium,
        Nutrient::Phosphorus,
        Nutrient::Zinc,
        Nutrient::VitaminA,
        Nutrient::VitaminC,
        Nutrient::VitaminD,
        Nutrient::VitaminB12,
        Nutrient::Folate,
    ];

    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        NUTRIENT_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|&(_, n)| n)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::Protein => "protein",
            Nutrient::Fat => "fat",
            Nutrient::Carbohydrates => "carbohydrates",
            Nutrient::Fiber => "fiber",
            Nutrient::Sugars => "sugars",
            Nutrient::Cholesterol => "cholesterol",
            Nutrient::Sodium => "sodium",
            Nutrient::Potassium => "potassium",
            Nutrient::Calcium => "calcium",
            Nutrient::Iron => "iron",
            Nutrient::Magnesium => "magnesium",
            Nutrient::Phosphorus => "phosphorus",
            Nutrient::Zinc => "zinc",
            Nutrient::VitaminA => "vitamin_a",
            Nutrient::VitaminC => "vitamin_c",
            Nutrient::VitaminD => "vitamin_d",
            Nutrient::VitaminB12 => "vitamin_b12",
            Nutrient::Folate => "folate",
        }
    }

    /// Column in `nutrition_facts`, unit suffix included.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Nutrient::Calories => "calories",
            Nutrient::Protein => "protein_g",
            Nutrient::Fat => "fat_g",
            Nutrient::Carbohydrates => "carbohydrates_g",
            Nutrient::Fiber => "fiber_g",
            Nutrient::Sugars => "sugar_g",
            Nutrient::Cholesterol => "cholesterol_mg",
            Nutrient::Sodium => "sodium_mg",
            Nutrient::Potassium => "potassium_mg",
            Nutrient::Calcium => "calcium_mg",
            Nutrient::Iron => "iron_mg",
            Nutrient::Magnesium => "magnesium_mg",
            Nutrient::Phosphorus => "phosphorus_mg",
            Nutrient::Zinc => "zinc_mg",
            Nutrient::VitaminA => "vitamin_a_iu",
            Nutrient::VitaminC => "vitamin_c_mg",
            Nutrient::VitaminD => "vitamin_d_iu",
            Nutrient::VitaminB12 => "vitamin_b12_mcg",
            Nutrient::Folate => "folate_mcg",
        }
    }
}

/// Map `(code, value)` pairs onto canonical nutrients.
///
/// Unknown codes and entries without a value are dropped. A code that appears
/// twice keeps its last value.
#[must_use]
pub fn map_nutrients<I>(entries: I) -> NutrientMap
where
    I: IntoIterator<Item = (Option<u32>, Option<f64>)>,
{
    entries
        .into_iter()
        .filter_map(|(code, value)| Some((Nutrient::from_code(code?)?, value?)))
        .collect()
}
