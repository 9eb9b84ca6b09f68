use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{CanonicalItem, FilterCriteria, ALL};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct MenuFilterParams {
    /// "All", a main category such as "Drinks", or "Main > Sub" such as "Main > Wraps".
    pub category: Option<String>,
    /// "All" or an exact brand name such as "KFC".
    pub company: Option<String>,
    /// Inclusive upper bound on salt in grams. Omit or 0 for no limit.
    pub max_salt: Option<f64>,
    /// Inclusive upper bound on fat in grams. Omit or 0 for no limit.
    pub max_fat: Option<f64>,
    /// Inclusive upper bound on calories (kcal). Omit or 0 for no limit.
    pub max_calories: Option<f64>,
}

impl MenuFilterParams {
    pub fn to_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            category: self.category.clone().unwrap_or_else(|| ALL.to_string()),
            company: self.company.clone().unwrap_or_else(|| ALL.to_string()),
            salt: self.max_salt,
            fat: self.max_fat,
            calories: self.max_calories,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchMenuParams {
    /// Free-text query; empty matches every item.
    pub query: Option<String>,
    pub filters: Option<MenuFilterParams>,
    /// Maximum number of results (default: configured page size).
    pub limit: Option<u32>,
    /// Rank by field relevance and popularity (default: true).
    pub ranked: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LoadMenuParams {
    /// Free-text query; empty loads every item that passes the filters.
    pub query: Option<String>,
    /// Replaces the session's filters when present; otherwise the previous filters apply.
    pub filters: Option<MenuFilterParams>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FilterLoadedParams {
    /// Case-insensitive substring matched against name, description, category and brand.
    pub query: Option<String>,
    pub filters: Option<MenuFilterParams>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ProductParams {
    /// Product identifier as returned in `product_id`.
    pub product_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MenuItem {
    pub product_id: String,
    pub name: String,
    pub company: String,
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
}

impl From<&CanonicalItem> for MenuItem {
    fn from(item: &CanonicalItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            company: item.company.clone(),
            category: item.category.clone(),
            description: item.description.clone(),
            image_url: item.image_url.clone(),
            url: item.url.clone(),
            calories: item.calories,
            fat: item.fat,
            salt: item.salt,
            protein: item.protein,
            carbs: item.carbs,
            sugar: item.sugar,
            likes: item.likes,
            dislikes: item.dislikes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NutritionView {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub sugar: f64,
    pub salt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MenuItemDetail {
    #[serde(flatten)]
    pub item: MenuItem,
    pub nutrition: NutritionView,
    pub ingredients: Vec<String>,
    pub ingredients_text: String,
}

impl From<&CanonicalItem> for MenuItemDetail {
    fn from(item: &CanonicalItem) -> Self {
        let summary = item.nutrition_summary();
        let allergens = item.allergen_info();
        Self {
            item: MenuItem::from(item),
            nutrition: NutritionView {
                calories: summary.calories,
                protein: summary.protein,
                fat: summary.fat,
                carbohydrates: summary.carbohydrates,
                sugar: summary.sugar,
                salt: summary.salt,
            },
            ingredients: allergens.ingredients,
            ingredients_text: allergens.ingredients_text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MenuListResponse {
    pub total: usize,
    pub items: Vec<MenuItem>,
}

impl MenuListResponse {
    pub fn from_items(items: &[CanonicalItem]) -> Self {
        Self {
            total: items.len(),
            items: items.iter().map(MenuItem::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoadMenuResponse {
    /// Increases with every load; lets callers spot a superseded result.
    pub generation: u64,
    pub total: usize,
    pub brands: Vec<String>,
    pub categories: Vec<String>,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MainCategoryInfo {
    pub name: String,
    pub sub_categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryStructureResponse {
    pub categories: Vec<MainCategoryInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BrandInfo {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BrandListResponse {
    pub brands: Vec<BrandInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VoteResponse {
    pub product_id: String,
    /// "likes" or "dislikes".
    pub counter: String,
    /// Whether the loaded collection was re-read after the vote. The vote is recorded
    /// either way.
    pub refreshed: bool,
    /// The item as re-read after the vote; absent if it is not in the loaded collection.
    pub item: Option<MenuItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_filter_params_are_unconstrained() {
        let criteria = MenuFilterParams::default().to_criteria();
        assert_eq!(criteria, FilterCriteria::default());
    }

    #[test]
    fn test_filter_params_carry_bounds() {
        let params = MenuFilterParams {
            category: Some("Main > Wraps".to_string()),
            max_salt: Some(2.0),
            ..MenuFilterParams::default()
        };
        let criteria = params.to_criteria();
        assert_eq!(criteria.category, "Main > Wraps");
        assert_eq!(criteria.company, "All");
        assert_eq!(criteria.salt, Some(2.0));
        assert_eq!(criteria.calories, None);
    }
}
