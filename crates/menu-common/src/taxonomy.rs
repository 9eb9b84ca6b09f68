/// Two-level category taxonomy for menu items.
///
/// Source menus use their own category labels ("Hamburgers", "McCafé®", "Twisters").
/// Every label is folded into a canonical `(main, sub)` pair through a fixed table.
/// Labels missing from the table land under `Other` with the raw label as the sub-category.
///
/// Canonical category strings are rendered as `"Main"` or `"Main > Sub"`.
use std::collections::{BTreeMap, BTreeSet};

/// Separator between main and sub category in a canonical category string.
pub const CATEGORY_SEPARATOR: &str = " > ";

/// Main category assigned to labels the table does not know.
pub const OTHER_CATEGORY: &str = "Other";

/// Raw source label, main category, sub category.
const CATEGORY_TABLE: &[(&str, &str, &str)] = &[
    ("Breakfast Menu", "Breakfast", "Breakfast Sandwiches"),
    ("Breakfast Sandwiches", "Breakfast", "Breakfast Sandwiches"),
    ("Breakfast Wraps", "Breakfast", "Breakfast Wraps"),
    ("Breakfast Combos", "Breakfast", "Breakfast Combos"),
    ("Breakfast Saver Menu®", "Breakfast", "Breakfast Combos"),
    ("Breakfast Sides", "Breakfast", "Breakfast Sides"),
    ("Burgers", "Main", "Beef Burgers"),
    ("Hamburgers", "Main", "Beef Burgers"),
    ("Chicken Sandwiches", "Main", "Chicken Sandwiches"),
    ("Twisters", "Main", "Wraps"),
    ("Wraps", "Main", "Wraps"),
    ("Wraps & Salads", "Main", "Wraps"),
    ("Fresh-Made Salads", "Main", "Salads"),
    ("Rice Bowls", "Main", "Bowls"),
    ("Veggie Options", "Main", "Vegetarian"),
    ("Vegetarian", "Main", "Vegetarian"),
    ("Vegan", "Main", "Vegetarian"),
    ("McNuggets®, Selects® & Veggie Dippers", "Main", "Chicken Pieces & Veggie Dippers"),
    ("Just Chicken", "Main", "Chicken Pieces & Veggie Dippers"),
    ("Chicken Nuggets & Tenders", "Main", "Chicken Pieces & Veggie Dippers"),
    ("Kfc Sharing Buckets", "Main", "Chicken Buckets"),
    ("Kids Buckets", "Main", "Chicken Buckets"),
    ("Buckets For One", "Main", "Chicken Buckets"),
    ("Combos", "Main", "Combos"),
    ("Box Meals", "Main", "Combos"),
    ("Biggie Deals", "Main", "Combos"),
    ("Sharers & Bundles", "Main", "Combos"),
    ("Fries & Sides", "Sides", "Potato Sides"),
    ("Sides Dips", "Sides", "Dips & Sauces"),
    ("Condiments And Sauces", "Sides", "Dips & Sauces"),
    ("McCafé®", "Drinks", "Hot Drinks"),
    ("Coffee & Beverages", "Drinks", "Hot Drinks"),
    ("Milkshakes & Cold Drinks", "Drinks", "Cold Drinks"),
    ("Frosty®", "Drinks", "Frozen Treats"),
    ("Drinks", "Drinks", "Soft Drinks"),
    ("Desserts", "Desserts", "Sweets & Bakery"),
    ("Happy Meal®", "Kids", "Kids Meals"),
    ("Wendy's Kids' Meal", "Kids", "Kids Meals"),
    ("Saver Menu®", "Value", "Value Meals"),
    ("What's New", "Promotional", "Limited Time"),
    ("Whats New", "Promotional", "Limited Time"),
    ("World Menu Heist", "Promotional", "Limited Time"),
];

/// A resolved `(main, sub)` category pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryPath<'a> {
    pub main: &'a str,
    pub sub: &'a str,
}

impl CategoryPath<'_> {
    /// Render as a canonical category string.
    pub fn to_category_string(&self) -> String {
        join_category(self.main, self.sub)
    }
}

/// Resolve a raw source label. Never fails: unknown labels map to `("Other", raw)`.
pub fn map_category(raw: &str) -> CategoryPath<'_> {
    CATEGORY_TABLE
        .iter()
        .find(|(label, _, _)| *label == raw)
        .map(|&(_, main, sub)| CategoryPath { main, sub })
        .unwrap_or(CategoryPath {
            main: OTHER_CATEGORY,
            sub: raw,
        })
}

/// All main categories in the table, sorted and deduplicated.
pub fn main_categories() -> Vec<&'static str> {
    CATEGORY_TABLE
        .iter()
        .map(|(_, main, _)| *main)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sub-categories under `main`, sorted and deduplicated. Empty for unknown mains.
pub fn sub_categories(main: &str) -> Vec<&'static str> {
    CATEGORY_TABLE
        .iter()
        .filter(|(_, m, _)| *m == main)
        .map(|(_, _, sub)| *sub)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Every main category with its sub-categories.
pub fn category_structure() -> BTreeMap<&'static str, Vec<&'static str>> {
    main_categories()
        .into_iter()
        .map(|main| (main, sub_categories(main)))
        .collect()
}

/// Split a canonical category string into `(main, sub)`.
///
/// Only the first two segments are considered; `sub` is empty when there is no separator.
/// Query construction and local filtering both go through this function.
pub fn split_category(category: &str) -> (&str, &str) {
    let mut parts = category.split(CATEGORY_SEPARATOR);
    let main = parts.next().unwrap_or_default();
    let sub = parts.next().unwrap_or_default();
    (main, sub)
}

/// Inverse of [`split_category`]: `"Main"` when `sub` is empty, else `"Main > Sub"`.
pub fn join_category(main: &str, sub: &str) -> String {
    if sub.is_empty() {
        main.to_string()
    } else {
        format!("{main}{CATEGORY_SEPARATOR}{sub}")
    }
}

/// Whether a filter value names a sub-category (`"Main > Sub"`) rather than a main category.
pub fn is_compound(category: &str) -> bool {
    category.contains(CATEGORY_SEPARATOR)
}
