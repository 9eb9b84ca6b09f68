//! End-to-end session behaviour against an in-process stand-in for the Solr core.
//!
//! The stub implements just enough of `select` and `update` for the client: substring
//! matching on `product_name` for non-match-all queries, atomic `inc` updates, brand
//! facets, and switches to inject failures and delays.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use menu_common::error::CommonError;
use menu_common::model::FilterCriteria;
use menu_common::session::SearchSession;
use menu_common::solr::{SolrClient, SolrClientConfig};

#[derive(Default)]
struct StubSolr {
    docs: Vec<Value>,
    select_params: Vec<Vec<(String, String)>>,
    update_params: Vec<Vec<(String, String)>>,
    update_bodies: Vec<Value>,
    failing_selects: usize,
    select_status: Option<StatusCode>,
    fail_next_update: bool,
    slow_query: Option<(String, Duration)>,
}

type Shared = Arc<Mutex<StubSolr>>;

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

async fn select(
    State(state): State<Shared>,
    Query(params): Query<Vec<(String, String)>>,
) -> (StatusCode, Json<Value>) {
    let (reply, delay) = {
        let mut stub = state.lock().unwrap();
        stub.select_params.push(params.clone());

        if stub.failing_selects > 0 {
            stub.failing_selects -= 1;
            let status = stub.select_status.unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
            return (status, Json(json!({ "error": { "msg": "unavailable" } })));
        }

        if param(&params, "facet") == Some("true") {
            let mut flat = Vec::new();
            for doc in &stub.docs {
                let brand = doc["brand"].as_str().unwrap_or_default().to_string();
                flat.push(json!(brand));
                flat.push(json!(1));
            }
            let body = json!({ "response": { "docs": [] }, "facet_counts": { "facet_fields": { "brand": flat } } });
            return (StatusCode::OK, Json(body));
        }

        let q = param(&params, "q").unwrap_or("*:*").to_string();
        let docs: Vec<Value> = stub
            .docs
            .iter()
            .filter(|doc| {
                q == "*:*"
                    || doc["product_name"]
                        .as_str()
                        .is_some_and(|name| name.to_lowercase().contains(&q.to_lowercase()))
            })
            .cloned()
            .collect();
        let delay = stub
            .slow_query
            .as_ref()
            .filter(|(slow, _)| *slow == q)
            .map(|(_, d)| *d);
        let body = json!({
            "responseHeader": { "status": 0 },
            "response": { "numFound": docs.len(), "docs": docs }
        });
        (body, delay)
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    (StatusCode::OK, Json(reply))
}

async fn update(
    State(state): State<Shared>,
    Query(params): Query<Vec<(String, String)>>,
    Json(batch): Json<Vec<Value>>,
) -> (StatusCode, Json<Value>) {
    let mut stub = state.lock().unwrap();
    stub.update_params.push(params);
    stub.update_bodies.push(Value::Array(batch.clone()));

    if stub.fail_next_update {
        stub.fail_next_update = false;
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "msg": "update failed" } })),
        );
    }

    for op in batch {
        let id = op["id"].as_str().unwrap_or_default().to_string();
        let Some(doc) = stub.docs.iter_mut().find(|d| d["id"] == id.as_str()) else {
            continue;
        };
        for (field, change) in op.as_object().into_iter().flatten() {
            if let Some(inc) = change.get("inc").and_then(Value::as_u64) {
                let current = doc[field.as_str()].as_u64().unwrap_or(0);
                doc[field.as_str()] = json!(current + inc);
            }
        }
    }
    (StatusCode::OK, Json(json!({ "responseHeader": { "status": 0, "QTime": 1 } })))
}

async fn spawn_stub(docs: Vec<Value>) -> (Shared, SocketAddr) {
    let state: Shared = Arc::new(Mutex::new(StubSolr {
        docs,
        ..StubSolr::default()
    }));
    let app = Router::new()
        .route("/menu/select", get(select))
        .route("/menu/update", post(update))
        .with_state(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, addr)
}

fn client(addr: SocketAddr, max_retries: u32) -> Arc<SolrClient> {
    let mut config = SolrClientConfig::new(&format!("http://{addr}/menu"));
    config.max_retries = max_retries;
    config.initial_backoff = Duration::from_millis(1);
    config.max_backoff = Duration::from_millis(5);
    config.timeout = Duration::from_secs(5);
    Arc::new(SolrClient::new(config).unwrap())
}

fn menu() -> Vec<Value> {
    vec![
        json!({
            "id": "kfc-zinger",
            "product_name": "Zinger Burger",
            "brand": "KFC",
            "category_main": "Main",
            "category_sub": "Chicken Sandwiches",
            "salt_g": [1.2],
            "calories_kcal": 450,
            "likes": 3,
            "dislikes": 0
        }),
        json!({
            "id": "mcd-fries",
            "product_name": "Fries",
            "brand": "McDonald's",
            "category_main": "Sides",
            "category_sub": "Potato Sides",
            "salt_g": 0.5,
            "likes": [1]
        }),
    ]
}

#[tokio::test]
async fn likes_increase_by_successful_votes_only() {
    let (stub, addr) = spawn_stub(menu()).await;
    let session = SearchSession::new(client(addr, 3));

    let loaded = session.fetch("", Some(FilterCriteria::default())).await.unwrap();
    assert_eq!(loaded.find("kfc-zinger").unwrap().likes, 3);

    assert!(session.like("kfc-zinger").await.unwrap().is_some());
    assert!(session.like("kfc-zinger").await.unwrap().is_some());

    stub.lock().unwrap().fail_next_update = true;
    let err = session.like("kfc-zinger").await.unwrap_err();
    assert!(matches!(err, CommonError::Upstream { status, .. } if status == reqwest::StatusCode::INTERNAL_SERVER_ERROR));

    let refreshed = session.refresh().await.unwrap();
    assert_eq!(refreshed.find("kfc-zinger").unwrap().likes, 5);
    assert_eq!(refreshed.find("kfc-zinger").unwrap().dislikes, 0);

    let stub = stub.lock().unwrap();
    assert_eq!(stub.update_bodies.len(), 3, "failed increments are not retried");
    assert_eq!(
        stub.update_bodies[0],
        json!([{ "id": "kfc-zinger", "likes": { "inc": 1 } }])
    );
    assert!(stub
        .update_params
        .iter()
        .all(|p| param(p, "commit") == Some("true")));
}

#[tokio::test]
async fn applied_vote_is_not_an_error_when_refresh_fails() {
    let (stub, addr) = spawn_stub(menu()).await;
    let session = SearchSession::new(client(addr, 0));
    session.fetch("", None).await.unwrap();

    stub.lock().unwrap().failing_selects = 1;
    let outcome = session.like("kfc-zinger").await.unwrap();
    assert!(outcome.is_none());
    assert!(session.snapshot().await.is_empty());

    let refreshed = session.refresh().await.unwrap();
    assert_eq!(refreshed.find("kfc-zinger").unwrap().likes, 4);
    assert_eq!(stub.lock().unwrap().update_bodies.len(), 1);
}

#[tokio::test]
async fn dislike_refreshes_with_last_query_and_filters() {
    let (stub, addr) = spawn_stub(menu()).await;
    let session = SearchSession::new(client(addr, 0));

    let filters = FilterCriteria {
        company: "KFC".to_string(),
        ..FilterCriteria::default()
    };
    session.fetch("zinger", Some(filters.clone())).await.unwrap();
    let after = session.dislike("kfc-zinger").await.unwrap().expect("refreshed");
    assert_eq!(after.find("kfc-zinger").unwrap().dislikes, 1);

    let stub = stub.lock().unwrap();
    let last = stub.select_params.last().unwrap();
    assert_eq!(param(last, "q"), Some("zinger"));
    assert!(last.iter().any(|(k, v)| k == "fq" && v == "brand:\"KFC\""));
    assert_eq!(session.last_query().await, "zinger");
    assert_eq!(session.last_filters().await, filters);
}

#[tokio::test]
async fn fetch_sends_filter_queries_and_page_size() {
    let (stub, addr) = spawn_stub(menu()).await;
    let session = SearchSession::new(client(addr, 0));

    let filters = FilterCriteria {
        category: "Main > Chicken Sandwiches".to_string(),
        ..FilterCriteria::initial()
    };
    session.fetch("", Some(filters)).await.unwrap();

    let stub = stub.lock().unwrap();
    let sent = &stub.select_params[0];
    assert_eq!(param(sent, "q"), Some("*:*"));
    assert_eq!(param(sent, "wt"), Some("json"));
    assert_eq!(param(sent, "rows"), Some("500"));
    assert_eq!(param(sent, "defType"), None);
    let fq: Vec<&str> = sent
        .iter()
        .filter(|(k, _)| k == "fq")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(
        fq,
        vec![
            "salt_g:[0 TO 10]",
            "fat_g:[0 TO 100]",
            "calories_kcal:[0 TO 2000]",
            "category_main:\"Main\" AND category_sub:\"Chicken Sandwiches\"",
        ]
    );
}

#[tokio::test]
async fn failed_fetch_clears_loaded_items() {
    let (stub, addr) = spawn_stub(menu()).await;
    let session = SearchSession::new(client(addr, 0));

    let loaded = session.fetch("", None).await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(!session.snapshot().await.is_empty());

    {
        let mut stub = stub.lock().unwrap();
        stub.failing_selects = 1;
        stub.select_status = Some(StatusCode::BAD_GATEWAY);
    }
    let err = session.fetch("", None).await.unwrap_err();
    assert!(matches!(err, CommonError::Upstream { .. }));
    assert!(session.snapshot().await.is_empty());
    assert!(!session.is_loading());
}

#[tokio::test]
async fn transient_select_failures_are_retried() {
    let (stub, addr) = spawn_stub(menu()).await;
    stub.lock().unwrap().failing_selects = 2;
    let session = SearchSession::new(client(addr, 2));

    let loaded = session.fetch("fries", None).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.items[0].product_id, "mcd-fries");
    assert_eq!(loaded.items[0].likes, 1);
    assert_eq!(stub.lock().unwrap().select_params.len(), 3);
}

#[tokio::test]
async fn stale_response_does_not_replace_newer_one() {
    let (stub, addr) = spawn_stub(menu()).await;
    stub.lock().unwrap().slow_query = Some(("zinger".to_string(), Duration::from_millis(300)));
    let session = SearchSession::new(client(addr, 0));

    let (slow, fast) = tokio::join!(session.fetch("zinger", None), session.fetch("fries", None));
    let slow = slow.unwrap();
    let fast = fast.unwrap();
    assert!(slow.generation < fast.generation);

    let current = session.snapshot().await;
    assert_eq!(current.generation, fast.generation);
    assert_eq!(current.items[0].product_id, "mcd-fries");
}

#[tokio::test]
async fn blank_product_id_never_reaches_solr() {
    let (stub, addr) = spawn_stub(menu()).await;
    let session = SearchSession::new(client(addr, 0));

    let err = session.like("").await.unwrap_err();
    assert!(matches!(err, CommonError::MissingProductId));
    assert!(stub.lock().unwrap().update_bodies.is_empty());
    assert!(stub.lock().unwrap().select_params.is_empty());
}

#[tokio::test]
async fn brand_facets_are_paired() {
    let (_stub, addr) = spawn_stub(menu()).await;
    let brands = client(addr, 0).brand_facets().await.unwrap();
    let names: Vec<&str> = brands.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["KFC", "McDonald's"]);
    assert!(brands.iter().all(|b| b.count == 1));
}
