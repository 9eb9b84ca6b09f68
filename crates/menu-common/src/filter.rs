/// Client-side filtering over an already loaded collection.
///
/// Applies the same constraints [`crate::query::filter_queries`] sends to Solr, so an item
/// kept here is exactly an item Solr would return for the same filters. Text matching is a
/// plain case-insensitive substring test rather than Solr's analyzed search.
use crate::model::{CanonicalItem, FilterCriteria};
use crate::taxonomy::{is_compound, split_category};

/// Items matching `text` and `filters`, in input order.
pub fn filter_items(items: &[CanonicalItem], text: &str, filters: &FilterCriteria) -> Vec<CanonicalItem> {
    let needle = text.trim().to_lowercase();
    items
        .iter()
        .filter(|item| matches_text(item, &needle) && matches_filters(item, filters))
        .cloned()
        .collect()
}

/// Company, category and nutrient constraints only. This is the local twin of the `fq` set.
pub fn matches_filters(item: &CanonicalItem, filters: &FilterCriteria) -> bool {
    matches_company(item, filters) && matches_category(item, filters) && matches_bounds(item, filters)
}

/// `needle` must already be trimmed and lowercased.
fn matches_text(item: &CanonicalItem, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    [&item.name, &item.description, &item.category, &item.company]
        .into_iter()
        .any(|field| field.to_lowercase().contains(needle))
}

fn matches_company(item: &CanonicalItem, filters: &FilterCriteria) -> bool {
    filters
        .company_constraint()
        .is_none_or(|company| item.company == company)
}

fn matches_category(item: &CanonicalItem, filters: &FilterCriteria) -> bool {
    let Some(category) = filters.category_constraint() else {
        return true;
    };
    let (item_main, item_sub) = split_category(&item.category);
    if is_compound(category) {
        let (main, sub) = split_category(category);
        item_main == main && item_sub == sub
    } else {
        item_main == category
    }
}

/// Inclusive `[0, bound]`, the same range Solr is asked for.
fn matches_bounds(item: &CanonicalItem, filters: &FilterCriteria) -> bool {
    filters
        .active_bounds()
        .all(|(nutrient, bound)| (0.0..=bound).contains(&nutrient.value_of(item)))
}
