//! HttpTransport and EntityClient against a local axum server.

mod common;

use axum::{
    extract::{Query as QueryParams, State},
    http::{HeaderMap, Method as HttpMethod, StatusCode, Uri},
    routing::get,
    Json, Router,
};
use common::*;
use odata_client::{EntityClient, HttpTransport, StaticToken};
use odata_query::{field, Cancellation, HttpRequest, QueryError, Transport};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// TRANSPORT
// ============================================================================

#[tokio::test]
async fn test_headers_and_decoded_options_reach_server() {
    async fn echo(
        headers: HeaderMap,
        QueryParams(params): QueryParams<HashMap<String, String>>,
    ) -> Json<Value> {
        Json(json!({
            "value": [{
                "authorization": header(&headers, "authorization"),
                "odata_version": header(&headers, "odata-version"),
                "accept": header(&headers, "accept"),
                "prefer": header(&headers, "prefer"),
                "params": params,
            }]
        }))
    }

    let base = serve(Router::new().route("/data/Customers", get(echo))).await;
    let config = config(&base);
    let client = EntityClient::new(
        Arc::new(HttpTransport::new(&config, Arc::new(StaticToken::new("secret"))).unwrap()),
        &config,
    );

    let query = client
        .query("Customers")
        .cross_company(true)
        .page_size(50)
        .filter(field("Name").equals("A&B + C"))
        .unwrap();
    let result = client.fetch(&query, &Cancellation::never()).await.unwrap();

    let echoed = &result.records[0];
    assert_eq!(echoed["authorization"], "Bearer secret");
    assert_eq!(echoed["odata_version"], "4.0");
    assert_eq!(echoed["accept"], "application/json");
    assert_eq!(echoed["prefer"], "odata.maxpagesize=50");
    assert_eq!(echoed["params"]["cross-company"], "true");
    assert_eq!(echoed["params"]["$filter"], "Name eq 'A&B + C'");
}

#[tokio::test]
async fn test_persistent_unauthorized_is_retried_once_then_returned() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/data/Customers",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (StatusCode::UNAUTHORIZED, "token expired")
            }),
        )
        .with_state(hits.clone());
    let base = serve(app).await;

    let tokens = Arc::new(RotatingToken::default());
    let transport = HttpTransport::new(&config(&base), tokens.clone()).unwrap();
    let response = transport.send(HttpRequest::get("Customers")).await.unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(response.body_text(), "token expired");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(tokens.refreshes(), 1);
}

#[tokio::test]
async fn test_retry_bound_follows_config() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/data/Customers",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                StatusCode::UNAUTHORIZED
            }),
        )
        .with_state(hits.clone());
    let base = serve(app).await;

    let mut no_retry = config(&base);
    no_retry.max_auth_retries = 0;
    let transport = HttpTransport::new(&no_retry, Arc::new(RotatingToken::default())).unwrap();
    transport.send(HttpRequest::get("Customers")).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let mut three = config(&base);
    three.max_auth_retries = 3;
    let transport = HttpTransport::new(&three, Arc::new(RotatingToken::default())).unwrap();
    transport.send(HttpRequest::get("Customers")).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1 + 4);
}

#[tokio::test]
async fn test_refreshed_token_recovers_request() {
    async fn guarded(headers: HeaderMap) -> (StatusCode, Json<Value>) {
        if header(&headers, "authorization") == "Bearer fresh" {
            (StatusCode::OK, Json(json!({ "value": [{"Id": 1}] })))
        } else {
            (StatusCode::UNAUTHORIZED, Json(json!({})))
        }
    }

    let base = serve(Router::new().route("/data/Customers", get(guarded))).await;
    let tokens = Arc::new(RotatingToken::default());
    let transport = HttpTransport::new(&config(&base), tokens.clone()).unwrap();

    let response = transport.send(HttpRequest::get("Customers")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(tokens.issued(), vec!["stale", "fresh"]);
}

#[tokio::test]
async fn test_connection_failure_is_status_zero() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(
        &config(&format!("http://{addr}/data/")),
        Arc::new(StaticToken::new("secret")),
    )
    .unwrap();
    let err = transport
        .send(HttpRequest::get("Customers"))
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::TransportFailure { status: 0, .. }));
}

// ============================================================================
// PAGING OVER HTTP
// ============================================================================

#[tokio::test]
async fn test_absolute_next_link_is_followed() {
    async fn pages(
        headers: HeaderMap,
        QueryParams(params): QueryParams<HashMap<String, String>>,
    ) -> Json<Value> {
        if params.contains_key("$skiptoken") {
            Json(json!({ "value": [{"Id": 3}] }))
        } else {
            let next = format!(
                "http://{}/data/Customers?$skiptoken=2",
                header(&headers, "host")
            );
            Json(json!({ "value": [{"Id": 1}, {"Id": 2}], "@odata.nextLink": next }))
        }
    }

    let base = serve(Router::new().route("/data/Customers", get(pages))).await;
    let client = EntityClient::from_config(&config(&base)).unwrap();

    let result = client
        .fetch(&client.query("Customers"), &Cancellation::never())
        .await
        .unwrap();

    let ids: Vec<i64> = result
        .records
        .iter()
        .filter_map(|r| r["Id"].as_i64())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(result.pages_fetched, 2);
}

#[tokio::test]
async fn test_failure_status_is_downcastable() {
    let app = Router::new().route(
        "/data/Customers",
        get(|| async { (StatusCode::BAD_REQUEST, "Invalid filter") }),
    );
    let base = serve(app).await;
    let client = EntityClient::from_config(&config(&base)).unwrap();

    let err = client
        .fetch(&client.query("Customers"), &Cancellation::never())
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<QueryError>(),
        Some(&QueryError::TransportFailure {
            status: 400,
            body: "Invalid filter".to_string()
        })
    );
}

// ============================================================================
// SINGLE-RECORD OPERATIONS
// ============================================================================

type Log = Arc<Mutex<Vec<(String, String, String)>>>;

async fn records_service(
    State(log): State<Log>,
    method: HttpMethod,
    uri: Uri,
    body: String,
) -> (StatusCode, String) {
    let target = match uri.query() {
        Some(q) => format!("{}?{}", uri.path(), q),
        None => uri.path().to_string(),
    };
    log.lock()
        .unwrap()
        .push((method.to_string(), target, body));

    match (method.as_str(), uri.path()) {
        ("GET", "/data/Customers(Id=1)") => (StatusCode::OK, json!({"Id": 1, "Name": "A"}).to_string()),
        ("GET", _) => (StatusCode::NOT_FOUND, String::new()),
        ("POST", "/data/Customers") => (StatusCode::CREATED, json!({"Id": 3}).to_string()),
        ("PATCH", "/data/Customers(Id=1)") | ("DELETE", "/data/Customers(Id=1)") => {
            (StatusCode::NO_CONTENT, String::new())
        }
        _ => (StatusCode::NOT_FOUND, "no such record".to_string()),
    }
}

#[tokio::test]
async fn test_single_record_operations() {
    let log: Log = Arc::default();
    let base = serve(Router::new().fallback(records_service).with_state(log.clone())).await;
    let client = EntityClient::from_config(&config(&base)).unwrap();

    let found = client
        .get(&client.query("Customers").key("Id", 1))
        .await
        .unwrap();
    assert_eq!(found, Some(json!({"Id": 1, "Name": "A"})));

    let missing = client
        .get(&client.query("Customers").key("Id", 2))
        .await
        .unwrap();
    assert_eq!(missing, None);

    let created = client
        .create("Customers", &json!({"Name": "C"}))
        .await
        .unwrap();
    assert_eq!(created, json!({"Id": 3}));

    client
        .update(&client.query("Customers").key("Id", 1), &json!({"Name": "B"}))
        .await
        .unwrap();
    client
        .delete(&client.query("Customers").key("Id", 1))
        .await
        .unwrap();

    let err = client
        .delete(&client.query("Customers").key("Id", 9))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<QueryError>(),
        Some(QueryError::TransportFailure { status: 404, .. })
    ));

    let log = log.lock().unwrap().clone();
    let calls: Vec<(&str, &str)> = log
        .iter()
        .map(|(m, t, _)| (m.as_str(), t.as_str()))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("GET", "/data/Customers(Id=1)"),
            ("GET", "/data/Customers(Id=2)"),
            ("POST", "/data/Customers"),
            ("PATCH", "/data/Customers(Id=1)"),
            ("DELETE", "/data/Customers(Id=1)"),
            ("DELETE", "/data/Customers(Id=9)"),
        ]
    );
    assert_eq!(log[2].2, r#"{"Name":"C"}"#);
    assert_eq!(log[3].2, r#"{"Name":"B"}"#);
}

#[tokio::test]
async fn test_key_operations_require_key() {
    let log: Log = Arc::default();
    let base = serve(Router::new().fallback(records_service).with_state(log.clone())).await;
    let client = EntityClient::from_config(&config(&base)).unwrap();

    let err = client.get(&client.query("Customers")).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<QueryError>(),
        Some(QueryError::MissingKey { .. })
    ));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cross_company_travels_with_keyed_request() {
    let log: Log = Arc::default();
    let base = serve(Router::new().fallback(records_service).with_state(log.clone())).await;
    let mut config = config(&base);
    config.cross_company = true;
    let client = EntityClient::from_config(&config).unwrap();

    client
        .get(&client.query("Customers").key("Id", 1))
        .await
        .unwrap();

    assert_eq!(
        log.lock().unwrap()[0].1,
        "/data/Customers(Id=1)?cross-company=true"
    );
}
