/// Response normalization.
///
/// Maps loosely-typed Solr documents onto [`CanonicalItem`]. Every function here is total:
/// malformed or missing fields fall back to defaults instead of failing, so one bad
/// document never hides the rest of a result page.
///
/// Coercion rules:
/// - numbers: first element of an array, else the value itself; numeric strings are parsed;
///   anything else is 0
/// - text: strings (empty counts as missing), numbers rendered as text, first array element
/// - identity: the `id` field, else a deterministic hash of the descriptive fields
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::model::{BrandCount, CanonicalItem, RawDocument};
use crate::taxonomy::{join_category, OTHER_CATEGORY};

pub const UNKNOWN_PRODUCT: &str = "Unknown Product";
pub const UNKNOWN_BRAND: &str = "Unknown Brand";
pub const NO_DESCRIPTION: &str = "No description available";
pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/400x300?text=Food+Item";
pub const NO_URL: &str = "#";

/// Prefix of identifiers synthesized for documents without an `id`.
pub const ANONYMOUS_ID_PREFIX: &str = "anon-";

pub fn normalize(docs: &[RawDocument]) -> Vec<CanonicalItem> {
    docs.iter().map(normalize_document).collect()
}

pub fn normalize_document(doc: &RawDocument) -> CanonicalItem {
    CanonicalItem {
        product_id: text(doc.id.as_ref()).unwrap_or_else(|| content_id(doc)),
        name: text(doc.product_name.as_ref()).unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
        company: text(doc.brand.as_ref()).unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
        category: category(doc),
        description: text(doc.description.as_ref()).unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        image_url: text(doc.image_url.as_ref()).unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        url: text(doc.url.as_ref()).unwrap_or_else(|| NO_URL.to_string()),
        calories: number(doc.calories_kcal.as_ref()),
        fat: number(doc.fat_g.as_ref()),
        salt: number(doc.salt_g.as_ref()),
        protein: number(doc.protein_g.as_ref()),
        carbs: number(doc.carbs_g.as_ref()),
        sugar: number(doc.sugar_g.as_ref()),
        likes: counter(doc.likes.as_ref()),
        dislikes: counter(doc.dislikes.as_ref()),
        ingredients_text: text(doc.ingredients_text.as_ref()).unwrap_or_default(),
        ingredients: string_list(doc.components_list.as_ref()),
    }
}

/// Extract `response.docs` from a select response body. Missing or malformed → empty.
pub fn parse_select_response(mut body: Value) -> Vec<RawDocument> {
    match body.pointer_mut("/response/docs").map(Value::take) {
        Some(Value::Array(docs)) => docs.into_iter().map(RawDocument::from_value).collect(),
        _ => Vec::new(),
    }
}

/// Decode the brand facet, a flat `[name, count, name, count, ...]` list.
pub fn parse_brand_facets(body: &Value) -> Vec<BrandCount> {
    let Some(flat) = body
        .pointer("/facet_counts/facet_fields/brand")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    flat.chunks(2)
        .filter_map(|pair| {
            let name = pair.first()?.as_str().filter(|s| !s.is_empty())?;
            let count = pair.get(1).and_then(Value::as_u64).unwrap_or(0);
            Some(BrandCount {
                name: name.to_string(),
                count,
            })
        })
        .collect()
}

/// `category_main`, or `Other` when absent, with `category_sub` appended when present.
/// `original_category` only feeds the fallback identity.
fn category(doc: &RawDocument) -> String {
    let main = text(doc.category_main.as_ref()).unwrap_or_else(|| OTHER_CATEGORY.to_string());
    let sub = text(doc.category_sub.as_ref()).unwrap_or_default();
    join_category(&main, &sub)
}

fn first(value: Option<&Value>) -> Option<&Value> {
    match value {
        Some(Value::Array(items)) => items.first(),
        other => other,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match first(value)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: Option<&Value>) -> f64 {
    match first(value) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn counter(value: Option<&Value>) -> u64 {
    let n = number(value);
    if n > 0.0 {
        n.floor() as u64
    } else {
        0
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| text(Some(item)))
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Stable identifier for a document without `id`: the same content always yields the same id.
fn content_id(doc: &RawDocument) -> String {
    let mut hasher = Sha256::new();
    for field in [
        &doc.product_name,
        &doc.brand,
        &doc.category_main,
        &doc.category_sub,
        &doc.original_category,
        &doc.description,
        &doc.url,
    ] {
        if let Some(value) = field {
            hasher.update(value.to_string().as_bytes());
        }
        hasher.update([0x1f_u8]);
    }
    let digest = hasher.finalize();
    format!("{ANONYMOUS_ID_PREFIX}{}", hex_lower(&digest[..8]))
}

fn hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}
