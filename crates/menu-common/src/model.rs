use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel accepted by category and brand filters meaning "no constraint".
pub const ALL: &str = "All";

/// A result document exactly as Solr returned it.
///
/// Nothing about the shape is trusted: any field may be missing, null, of the wrong
/// type, or wrapped in a single-element array. Typed extraction happens in
/// [`crate::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDocument {
    pub id: Option<Value>,
    pub product_name: Option<Value>,
    pub brand: Option<Value>,
    pub category_main: Option<Value>,
    pub category_sub: Option<Value>,
    /// Label used by the source menu before taxonomy mapping.
    pub original_category: Option<Value>,
    pub description: Option<Value>,
    pub image_url: Option<Value>,
    pub url: Option<Value>,
    pub ingredients_text: Option<Value>,
    pub components_list: Option<Value>,
    pub calories_kcal: Option<Value>,
    pub fat_g: Option<Value>,
    pub salt_g: Option<Value>,
    pub protein_g: Option<Value>,
    pub carbs_g: Option<Value>,
    pub sugar_g: Option<Value>,
    pub likes: Option<Value>,
    pub dislikes: Option<Value>,
}

impl RawDocument {
    /// Build from an arbitrary JSON value. Non-objects become an empty document.
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// A menu item in the one shape every consumer sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalItem {
    pub product_id: String,
    pub name: String,
    pub company: String,
    /// `"Main"` or `"Main > Sub"`.
    pub category: String,
    pub description: String,
    pub image_url: String,
    pub url: String,
    pub calories: f64,
    pub fat: f64,
    pub salt: f64,
    pub protein: f64,
    pub carbs: f64,
    pub sugar: f64,
    pub likes: u64,
    pub dislikes: u64,
    pub ingredients_text: String,
    pub ingredients: Vec<String>,
}

impl CanonicalItem {
    pub fn nutrition_summary(&self) -> NutritionSummary {
        NutritionSummary {
            calories: self.calories,
            protein: self.protein,
            fat: self.fat,
            carbohydrates: self.carbs,
            sugar: self.sugar,
            salt: self.salt,
        }
    }

    pub fn allergen_info(&self) -> AllergenInfo {
        AllergenInfo {
            ingredients: self.ingredients.clone(),
            ingredients_text: self.ingredients_text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionSummary {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub sugar: f64,
    pub salt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllergenInfo {
    pub ingredients: Vec<String>,
    pub ingredients_text: String,
}

/// Nutrients that accept an upper-bound filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nutrient {
    Salt,
    Fat,
    Calories,
}

impl Nutrient {
    pub const BOUNDED: [Nutrient; 3] = [Nutrient::Salt, Nutrient::Fat, Nutrient::Calories];

    /// Solr field holding this nutrient.
    pub fn solr_field(self) -> &'static str {
        match self {
            Nutrient::Salt => "salt_g",
            Nutrient::Fat => "fat_g",
            Nutrient::Calories => "calories_kcal",
        }
    }

    pub fn value_of(self, item: &CanonicalItem) -> f64 {
        match self {
            Nutrient::Salt => item.salt,
            Nutrient::Fat => item.fat,
            Nutrient::Calories => item.calories,
        }
    }
}

/// Constraints applied both by Solr filter queries and by the local filter engine.
///
/// `category` and `company` accept [`ALL`] or the empty string for "no constraint".
/// A nutrient bound is an inclusive maximum; `None`, `0` and NaN all leave the nutrient
/// unconstrained, so a literal zero bound cannot be expressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub category: String,
    pub company: String,
    pub salt: Option<f64>,
    pub fat: Option<f64>,
    pub calories: Option<f64>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            category: ALL.to_string(),
            company: ALL.to_string(),
            salt: None,
            fat: None,
            calories: None,
        }
    }
}

impl FilterCriteria {
    /// Filters a fresh session starts with.
    pub fn initial() -> Self {
        Self {
            salt: Some(10.0),
            fat: Some(100.0),
            calories: Some(2000.0),
            ..Self::default()
        }
    }

    pub fn category_constraint(&self) -> Option<&str> {
        constraint(&self.category)
    }

    pub fn company_constraint(&self) -> Option<&str> {
        constraint(&self.company)
    }

    /// The effective bound for a nutrient, if any.
    pub fn bound(&self, nutrient: Nutrient) -> Option<f64> {
        let raw = match nutrient {
            Nutrient::Salt => self.salt,
            Nutrient::Fat => self.fat,
            Nutrient::Calories => self.calories,
        };
        raw.filter(|b| *b != 0.0 && !b.is_nan())
    }

    /// Active bounds in a fixed order: salt, fat, calories.
    pub fn active_bounds(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        Nutrient::BOUNDED
            .into_iter()
            .filter_map(|n| self.bound(n).map(|b| (n, b)))
    }
}

fn constraint(value: &str) -> Option<&str> {
    if value.is_empty() || value == ALL {
        None
    } else {
        Some(value)
    }
}

/// Popularity counters that can be incremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Counter {
    Likes,
    Dislikes,
}

impl Counter {
    /// Solr field holding the counter.
    pub fn field(self) -> &'static str {
        match self {
            Counter::Likes => "likes",
            Counter::Dislikes => "dislikes",
        }
    }
}

/// One brand and its document count from Solr faceting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandCount {
    pub name: String,
    pub count: u64,
}
