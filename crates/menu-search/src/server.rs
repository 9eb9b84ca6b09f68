/// MCP server over the fast-food menu.
///
/// Stateless tools (`search_menu`, `list_categories`, `list_brands`) go straight to Solr or
/// the taxonomy. `load_menu`, `filter_loaded`, `get_item` and the vote tools share one
/// [`SearchSession`], so a client can load a collection once and refine it locally.
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::cache::MenuCache;
use crate::error::AppError;
use menu_common::error::CommonError;
use menu_common::mcp_api::{
    BrandInfo, BrandListResponse, CategoryStructureResponse, FilterLoadedParams, LoadMenuParams,
    LoadMenuResponse, MainCategoryInfo, MenuItem, MenuItemDetail, MenuListResponse,
    ProductParams, SearchMenuParams, VoteResponse,
};
use menu_common::model::Counter;
use menu_common::normalize::normalize;
use menu_common::query::{build_query, QueryMode, QueryOptions};
use menu_common::session::{ItemSnapshot, SearchSession};
use menu_common::solr::SolrClient;
use menu_common::taxonomy::category_structure;

/// Upper bound on `search_menu` page size.
const MAX_LIMIT: u32 = 1_000;

#[derive(Clone)]
pub struct MenuSearchServer {
    client: Arc<SolrClient>,
    session: Arc<SearchSession>,
    cache: Arc<MenuCache>,
    tool_router: ToolRouter<MenuSearchServer>,
}

impl MenuSearchServer {
    pub fn new(client: Arc<SolrClient>, cache: Arc<MenuCache>) -> Self {
        let session = Arc::new(SearchSession::new(Arc::clone(&client)));
        Self {
            client,
            session,
            cache,
            tool_router: Self::tool_router(),
        }
    }

    /// A server sharing this one's client and cache but starting from an empty session.
    pub fn fresh_session(&self) -> Self {
        Self::new(Arc::clone(&self.client), Arc::clone(&self.cache))
    }

    async fn search(&self, params: SearchMenuParams) -> Result<MenuListResponse, AppError> {
        let text = params.query.unwrap_or_default();
        let filters = params.filters.unwrap_or_default().to_criteria();
        let opts = QueryOptions {
            mode: if params.ranked.unwrap_or(true) {
                QueryMode::Ranked
            } else {
                QueryMode::Filtered
            },
            rows: params
                .limit
                .map(|limit| limit.clamp(1, MAX_LIMIT))
                .unwrap_or(self.client.config().rows),
        };
        let query = build_query(&text, &filters, &opts);

        if let Some(cached) = self.cache.get_search(&query).await {
            return Ok(cached);
        }

        let docs = self.client.search(&query).await?;
        let response = MenuListResponse::from_items(&normalize(&docs));
        self.cache.set_search(&query, &response).await;
        Ok(response)
    }

    async fn brands(&self) -> Result<Vec<BrandInfo>, AppError> {
        if let Some(cached) = self.cache.get_brands().await {
            return Ok(cached);
        }
        let brands: Vec<BrandInfo> = self
            .client
            .brand_facets()
            .await?
            .into_iter()
            .map(|b| BrandInfo {
                name: b.name,
                count: b.count,
            })
            .collect();
        self.cache.set_brands(&brands).await;
        Ok(brands)
    }

    async fn vote(&self, product_id: &str, counter: Counter) -> Result<VoteResponse, AppError> {
        let product_id = product_id.trim();
        let result = self.session.vote(product_id, counter).await;
        if !matches!(result, Err(CommonError::MissingProductId)) {
            // A failed increment may still have been applied.
            self.cache.invalidate_all().await;
        }
        let snapshot = result?;
        info!(product_id, counter = counter.field(), refreshed = snapshot.is_some(), "vote recorded");
        Ok(vote_response(product_id, counter, snapshot.as_deref()))
    }
}

fn vote_response(product_id: &str, counter: Counter, snapshot: Option<&ItemSnapshot>) -> VoteResponse {
    VoteResponse {
        product_id: product_id.to_string(),
        counter: counter.field().to_string(),
        refreshed: snapshot.is_some(),
        item: snapshot
            .and_then(|s| s.find(product_id))
            .map(MenuItem::from),
    }
}

#[tool_router]
impl MenuSearchServer {
    #[tool(description = "Search the fast-food menu. Free text is matched against product name, brand, category, ingredients and description; results are ranked by relevance and popularity unless ranked is false. Filters narrow by category ('Main > Beef Burgers'), brand, and maximum salt, fat and calories.")]
    async fn search_menu(
        &self,
        Parameters(params): Parameters<SearchMenuParams>,
    ) -> Result<Json<MenuListResponse>, String> {
        self.search(params)
            .await
            .map(Json)
            .map_err(|e| format!("search failed: {e}"))
    }

    #[tool(description = "Load menu items matching a query and filters into this session, replacing any previously loaded items. Omitted filters keep the previous ones; the first load defaults to salt <= 10 g, fat <= 100 g and calories <= 2000.")]
    async fn load_menu(
        &self,
        Parameters(params): Parameters<LoadMenuParams>,
    ) -> Result<Json<LoadMenuResponse>, String> {
        let text = params.query.unwrap_or_default();
        let filters = params.filters.map(|f| f.to_criteria());
        let snapshot = self
            .session
            .fetch(&text, filters)
            .await
            .map_err(|e| format!("load failed: {e}"))?;

        Ok(Json(LoadMenuResponse {
            generation: snapshot.generation,
            total: snapshot.len(),
            brands: snapshot.brands().into_iter().map(str::to_string).collect(),
            categories: snapshot.categories().into_iter().map(str::to_string).collect(),
            items: snapshot.items.iter().map(MenuItem::from).collect(),
        }))
    }

    #[tool(description = "Filter the items loaded by load_menu without querying the search engine. Uses the session's filters when none are given.")]
    async fn filter_loaded(
        &self,
        Parameters(params): Parameters<FilterLoadedParams>,
    ) -> Result<Json<MenuListResponse>, String> {
        let filters = match params.filters {
            Some(filters) => filters.to_criteria(),
            None => self.session.last_filters().await,
        };
        let text = params.query.unwrap_or_default();
        let snapshot = self.session.snapshot().await;
        let items = snapshot.filter(&text, &filters);
        Ok(Json(MenuListResponse::from_items(&items)))
    }

    #[tool(description = "Get one loaded menu item by product_id, with its nutrition summary and ingredients.")]
    async fn get_item(
        &self,
        Parameters(params): Parameters<ProductParams>,
    ) -> Result<Json<MenuItemDetail>, String> {
        let product_id = params.product_id.trim();
        if product_id.is_empty() {
            return Err("product_id must not be empty".to_string());
        }
        let snapshot = self.session.snapshot().await;
        snapshot
            .find(product_id)
            .map(|item| Json(MenuItemDetail::from(item)))
            .ok_or_else(|| AppError::NotFound(product_id.to_string()).to_string())
    }

    #[tool(description = "List the menu category taxonomy: main categories and their sub-categories.")]
    async fn list_categories(&self) -> Result<Json<CategoryStructureResponse>, String> {
        let categories = category_structure()
            .into_iter()
            .map(|(main, subs)| MainCategoryInfo {
                name: main.to_string(),
                sub_categories: subs.into_iter().map(str::to_string).collect(),
            })
            .collect();
        Ok(Json(CategoryStructureResponse { categories }))
    }

    #[tool(description = "List brands on the menu with their item counts.")]
    async fn list_brands(&self) -> Result<Json<BrandListResponse>, String> {
        let brands = self
            .brands()
            .await
            .map_err(|e| format!("brand listing failed: {e}"))?;
        Ok(Json(BrandListResponse { brands }))
    }

    #[tool(description = "Record a like for a menu item, then reload the session's items so the stored count is returned.")]
    async fn like_item(
        &self,
        Parameters(params): Parameters<ProductParams>,
    ) -> Result<Json<VoteResponse>, String> {
        self.vote(&params.product_id, Counter::Likes)
            .await
            .map(Json)
            .map_err(|e| format!("like failed: {e}"))
    }

    #[tool(description = "Record a dislike for a menu item, then reload the session's items so the stored count is returned.")]
    async fn dislike_item(
        &self,
        Parameters(params): Parameters<ProductParams>,
    ) -> Result<Json<VoteResponse>, String> {
        self.vote(&params.product_id, Counter::Dislikes)
            .await
            .map(Json)
            .map_err(|e| format!("dislike failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for MenuSearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "menu-search".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Fast-food menu search backed by Solr. Use search_menu for one-off ranked \
                 searches, load_menu then filter_loaded and get_item to browse a loaded \
                 collection, list_categories and list_brands for filter values, and \
                 like_item or dislike_item to vote on an item."
                    .to_string(),
            ),
        }
    }
}
