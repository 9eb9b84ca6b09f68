/// Solr query construction.
///
/// Turns search text and a [`FilterCriteria`] into a [`QueryDescriptor`], which renders
/// to the select handler's query parameters. Two modes exist:
/// - `Filtered`: plain `q` plus `fq` clauses, used to load a collection.
/// - `Ranked`: additionally uses edismax with per-field boosts and a popularity boost.
///
/// The `fq` clauses produced here are mirrored field-for-field by [`crate::filter`].
use crate::model::{FilterCriteria, Nutrient};
use crate::taxonomy::{is_compound, split_category};

/// Query that matches every document.
pub const MATCH_ALL: &str = "*:*";

/// Page size when neither configuration nor the caller sets one.
pub const DEFAULT_ROWS: u32 = 500;

/// Full-text fields and their edismax weights, highest first.
const FIELD_BOOSTS: &[(&str, f32)] = &[
    ("product_name", 6.0),
    ("category_main", 4.0),
    ("category_sub", 3.0),
    ("description", 2.5),
    ("ingredients_text", 2.0),
];

/// `log(1 + popularity_score)` scaled by 1.5.
const POPULARITY_BOOST: &str = "log(sum(1,popularity_score))^1.5";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    #[default]
    Filtered,
    Ranked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub mode: QueryMode,
    pub rows: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            mode: QueryMode::Filtered,
            rows: DEFAULT_ROWS,
        }
    }
}

/// edismax parameters for ranked search.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Boosted query fields; absent for match-all queries.
    pub qf: Option<String>,
    pub bf: String,
}

/// Everything needed to issue one select request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub q: String,
    pub rows: u32,
    pub filter_queries: Vec<String>,
    pub ranking: Option<Ranking>,
}

impl QueryDescriptor {
    pub fn is_match_all(&self) -> bool {
        self.q == MATCH_ALL
    }

    /// Render as query-string pairs, `fq` repeated once per clause.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.q.clone()),
            ("wt", "json".to_string()),
            ("rows", self.rows.to_string()),
        ];
        if let Some(ranking) = &self.ranking {
            params.push(("defType", "edismax".to_string()));
            if let Some(qf) = &ranking.qf {
                params.push(("qf", qf.clone()));
            }
            params.push(("bf", ranking.bf.clone()));
        }
        params.extend(self.filter_queries.iter().map(|fq| ("fq", fq.clone())));
        params
    }
}

/// Build the select query for `text` under `filters`. Never fails; inactive constraints are
/// simply omitted.
pub fn build_query(text: &str, filters: &FilterCriteria, opts: &QueryOptions) -> QueryDescriptor {
    let text = text.trim();
    let q = if text.is_empty() {
        MATCH_ALL.to_string()
    } else {
        text.to_string()
    };

    let ranking = match opts.mode {
        QueryMode::Filtered => None,
        QueryMode::Ranked => Some(Ranking {
            qf: (!text.is_empty()).then(boosted_fields),
            bf: POPULARITY_BOOST.to_string(),
        }),
    };

    QueryDescriptor {
        q,
        rows: opts.rows,
        filter_queries: filter_queries(filters),
        ranking,
    }
}

/// The `fq` clauses for a filter set: nutrient ranges, then brand, then category.
pub fn filter_queries(filters: &FilterCriteria) -> Vec<String> {
    let mut fq: Vec<String> = filters
        .active_bounds()
        .map(|(nutrient, bound)| range_filter(nutrient, bound))
        .collect();

    if let Some(company) = filters.company_constraint() {
        fq.push(format!("brand:{}", quote(company)));
    }
    if let Some(category) = filters.category_constraint() {
        fq.push(category_filter(category));
    }
    fq
}

fn boosted_fields() -> String {
    FIELD_BOOSTS
        .iter()
        .map(|(field, weight)| format!("{field}^{weight:.1}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn range_filter(nutrient: Nutrient, bound: f64) -> String {
    format!("{}:[0 TO {bound}]", nutrient.solr_field())
}

fn category_filter(category: &str) -> String {
    if is_compound(category) {
        let (main, sub) = split_category(category);
        format!("category_main:{} AND category_sub:{}", quote(main), quote(sub))
    } else {
        format!("category_main:{}", quote(category))
    }
}

/// Wrap a value in a Solr phrase, escaping backslashes and quotes.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
