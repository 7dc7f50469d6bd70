/*
 * Copyright 2025 Vijaykumar Singh
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! REST API integration tests

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use bizdir::core::{Config, QuotaConfig};
use bizdir::network::RestServer;
use bizdir::storage::filesystem::memory::MemoryBlobStore;
use bizdir::storage::BlobStoreClient;
use bizdir::{BizDir, DirectoryService};

fn seeded_store() -> Arc<MemoryBlobStore> {
    Arc::new(MemoryBlobStore::with_objects([
        (
            "stores/Telangana/Hyderabad/Kukatpally/Grocery/Kirana_Store/stores.json",
            json!([
                {"id": "k1", "name": "Sri Balaji Kirana", "state": "Telangana", "city": "Hyderabad",
                 "mandal": "Kukatpally", "category": "Grocery", "serviceType": "Kirana Store"},
                {"id": "k2", "name": "Lakshmi General Stores", "state": "Telangana", "city": "Hyderabad",
                 "mandal": "Kukatpally", "category": "Grocery", "serviceType": "Kirana Store"},
                {"id": "k3", "name": "Annapurna Provisions", "state": "Telangana", "city": "Hyderabad",
                 "mandal": "Kukatpally", "category": "Grocery", "serviceType": "Kirana Store"}
            ])
            .to_string(),
        ),
        (
            "services/Telangana/Hyderabad/Madhapur/Repair/Plumber/services.json",
            json!([
                {"id": "p1", "name": "Quick Fix Plumbing", "state": "Telangana", "city": "Hyderabad",
                 "mandal": "Madhapur", "category": "Repair", "serviceType": "Plumber", "tags": ["pipes"]}
            ])
            .to_string(),
        ),
        ("services/Telangana/Hyderabad/Madhapur/Repair/Electrician/services.json", "{\"broken\": true}".to_string()),
        (
            "meta/categories.json",
            json!({
                "stores": {"Grocery": ["Kirana Store", "Supermarket"]},
                "services": {"Repair": ["Plumber", "Electrician"]}
            })
            .to_string(),
        ),
        ("meta/about.json", json!({"title": "Hyderabad Directory"}).to_string()),
    ]))
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1".to_string();
    config.server.port = 0;
    config.registration.quota = QuotaConfig::Windowed {
        max_registrations: 1,
        window_days: 30,
    };
    config.registration.expose_verification_codes = true;
    config
}

fn service(config: &Config) -> Arc<DirectoryService> {
    let client = BlobStoreClient::new(seeded_store(), Duration::from_secs(5));
    Arc::new(DirectoryService::new(client, config))
}

fn router() -> Router {
    let config = test_config();
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    RestServer::new(addr, service(&config), true).router()
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri, None).await
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(router, Method::POST, uri, Some(body)).await
}

#[tokio::test]
async fn test_health_and_meta_documents() {
    let router = router();

    let (status, body) = get(&router, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["status"], json!("healthy"));
    assert_eq!(body["data"]["store"], json!("memory"));

    let (_, about) = get(&router, "/api/about").await;
    assert_eq!(about, json!({"title": "Hyderabad Directory"}));

    // no ads document stored, defaults are served
    let (status, ads) = get(&router, "/api/ads").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ads.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_locations_and_categories() {
    let router = router();

    let (_, states) = get(&router, "/api/locations").await;
    assert_eq!(states, json!(["Telangana"]));

    let (_, mandals) = get(&router, "/api/locations?state=Telangana&city=Hyderabad").await;
    assert_eq!(mandals, json!(["Kukatpally", "Madhapur"]));

    let (_, all) = get(&router, "/api/categories").await;
    assert_eq!(all["services"]["Repair"], json!(["Plumber", "Electrician"]));

    let (_, stores) = get(&router, "/api/categories?kind=stores").await;
    assert_eq!(stores, json!({"Grocery": ["Kirana Store", "Supermarket"]}));

    let (status, body) = get(&router, "/api/categories?kind=shops").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_list_stores_with_paging() {
    let router = router();

    let (status, body) = get(
        &router,
        "/api/stores?state=Telangana&city=Hyderabad&mandal=Kukatpally&category=Grocery&type=Kirana%20Store&page=2&limit=2",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], json!("k3"));
    assert_eq!(
        body["pagination"],
        json!({"page": 2, "limit": 2, "total": 3, "totalPages": 2, "hasNext": false, "hasPrev": true})
    );
    assert_eq!(body["hierarchyPath"].as_array().unwrap().len(), 5);
    assert_eq!(body["hierarchyPath"][4], json!({"level": "type", "value": "Kirana Store"}));

    let (status, _) = get(&router, "/api/stores?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_partition_is_skipped() {
    let router = router();

    let (status, body) = get(&router, "/api/services?state=Telangana").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], json!(1));
    assert_eq!(body["data"][0]["name"], json!("Quick Fix Plumbing"));

    let (_, flat) = get(&router, "/api/all-services").await;
    assert_eq!(flat["pagination"]["limit"], json!(20));
    assert_eq!(flat["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_endpoint() {
    let router = router();

    let (status, body) = post(
        &router,
        "/api/search",
        json!({"query": "PIPES", "categoryType": "all"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["kind"], json!("services"));

    let (_, body) = post(
        &router,
        "/api/search",
        json!({"filters": {"mandal": "Kukatpally", "type": "Kirana Store", "limit": 2}}),
    )
    .await;
    assert_eq!(body["pagination"]["total"], json!(3));
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = post(&router, "/api/search", json!({"kindFilter": "shops"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_then_list() {
    let router = router();
    let business = json!({
        "name": "Fresh Mart",
        "state": "Telangana",
        "city": "Hyderabad",
        "mandal": "Kukatpally",
        "category": "Grocery",
        "serviceType": "Supermarket",
        "phone": "9876543210",
        "extraField": "kept"
    });

    let (status, outcome) = post(
        &router,
        "/api/register",
        json!({"kind": "stores", "business": business.clone()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["accepted"], json!(true));
    assert_eq!(
        outcome["partitionKey"],
        json!("stores/Telangana/Hyderabad/Kukatpally/Grocery/Supermarket/stores.json")
    );

    let (_, listed) = get(
        &router,
        "/api/stores?state=Telangana&city=Hyderabad&mandal=Kukatpally&category=Grocery&type=Supermarket",
    )
    .await;
    assert_eq!(listed["data"][0]["status"], json!("pending"));
    assert_eq!(listed["data"][0]["extraField"], json!("kept"));

    // quota of one per window
    let (status, outcome) = post(
        &router,
        "/api/register",
        json!({"categoryType": "stores", "mobile": "9876543210", "business": business}),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(outcome["reason"], json!("QuotaExceeded"));
}

#[tokio::test]
async fn test_register_rejections() {
    let router = router();

    let (status, outcome) = post(
        &router,
        "/api/register",
        json!({"kind": "stores", "mobile": "12345", "business": {"name": "X"}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(outcome["reason"], json!("InvalidMobile"));

    let (status, outcome) = post(
        &router,
        "/api/register",
        json!({"kind": "services", "mobile": "9876543210", "business": {"name": "X"}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(outcome["reason"], json!("MissingField"));
    assert_eq!(outcome["missingFields"].as_array().unwrap().len(), 6);

    let (status, _) = post(
        &router,
        "/api/register",
        json!({"kind": "shops", "business": {}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verification_flow() {
    let router = router();

    let (status, sent) = post(&router, "/api/verification/send", json!({"phone": "9876543210"})).await;
    assert_eq!(status, StatusCode::OK);
    let code = sent["data"]["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    let (_, wrong) = post(
        &router,
        "/api/verification/verify",
        json!({"phone": "9876543210", "otp": "000000x"}),
    )
    .await;
    assert_eq!(wrong["success"], json!(false));

    let (_, ok) = post(
        &router,
        "/api/verification/verify",
        json!({"mobile": "9876543210", "code": code}),
    )
    .await;
    assert_eq!(ok["success"], json!(true));

    let (status, _) = post(&router, "/api/verification/send", json!({"phone": "42"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    bizdir::monitoring::init_metrics();
    let router = router();
    let _ = get(&router, "/api/stores").await;

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("bizdir_requests_total"));

    let config = test_config();
    let disabled = RestServer::new("127.0.0.1:0".parse().unwrap(), service(&config), false).router();
    let (status, _) = get(&disabled, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_live_server_lifecycle() {
    let config = test_config();
    let mut db = BizDir::with_service(service(&config), config);
    assert!(!db.is_server_running());

    db.start().await.expect("server starts");
    assert!(db.is_server_running());
    let addr = db.http_server_address().expect("bound address");
    assert_ne!(addr.port(), 0);

    let client = reqwest::Client::new();
    let health: Value = client
        .get(format!("http://{}/api/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["data"]["status"], json!("healthy"));

    let search = client
        .post(format!("http://{}/api/search", addr))
        .json(&json!({"query": "balaji"}))
        .send()
        .await
        .unwrap();
    assert!(search.status().is_success());
    let body: Value = search.json().await.unwrap();
    assert_eq!(body["data"][0]["id"], json!("k1"));

    db.stop().await.expect("server stops");
    assert!(!db.is_server_running());
    assert!(db.http_server_address().is_none());
}
