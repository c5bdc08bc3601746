//! Collector HTTP API, exercised in-process with `oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use cotton_history::{HistoryStore, MemoryHistory, SurrealHistory};
use cottond::{app, AppState, CollectorStore};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router_with(history: Arc<dyn HistoryStore>) -> Router {
    app(AppState::new(CollectorStore::new(history)))
}

fn router() -> Router {
    router_with(Arc::new(MemoryHistory::new()))
}

fn payload(category: &str, confidence: Value, treat: bool) -> Value {
    json!({
        "category": category,
        "confidence": confidence,
        "treat": treat,
        "guidance_primary": "Use insecticidal soap or neem oil.",
        "guidance_secondary": "नीम का तेल उपयोग करें।",
        "agent_primary": "Imidacloprid",
        "agent_secondary": "इमिडाक्लोप्रिड",
        "captured_at": "2025-03-14 09:26:53"
    })
}

async fn post_json(router: &Router, body: String) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post("/api/prediction")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post(router: &Router, body: Value) -> (StatusCode, Value) {
    post_json(router, body.to_string()).await
}

async fn get_raw(router: &Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get_raw(router, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn test_ingest_then_latest_and_history() {
    let router = router();

    let (status, body) = post(&router, payload("Aphids", json!(91.23), true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "success", "message": "Prediction received" })
    );

    let (status, _) = post(&router, payload("Healthy", json!(99.0), false)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, latest) = get(&router, "/api/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["category"], "Healthy");
    assert_eq!(latest["treat"], false);

    let (_, all) = get(&router, "/api/predictions").await;
    let predictions = all["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0]["category"], "Aphids");
    assert_eq!(predictions[0]["confidence"], 91.23);
    assert_eq!(predictions[0]["agent_secondary"], "इमिडाक्लोप्रिड");
    assert_eq!(predictions[1], latest);
}

#[tokio::test]
async fn test_latest_on_empty_collector() {
    let (status, body) = get(&router(), "/api/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "No predictions available" }));

    let (_, all) = get(&router(), "/api/predictions").await;
    assert_eq!(all, json!({ "predictions": [] }));
}

#[tokio::test]
async fn test_confidence_out_of_range_rejected() {
    let router = router();
    post(&router, payload("Aphids", json!(91.23), true)).await;

    let (status, body) = post(&router, payload("Aphids", json!(150), true)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("150"));

    let (_, all) = get(&router, "/api/predictions").await;
    assert_eq!(all["predictions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_schema_violations_rejected() {
    let router = router();

    let mut wrong_type = payload("Aphids", json!(50), true);
    wrong_type["treat"] = json!("yes");
    let mut missing = payload("Aphids", json!(50), true);
    missing.as_object_mut().unwrap().remove("captured_at");
    let mut bad_time = payload("Aphids", json!(50), true);
    bad_time["captured_at"] = json!("2025-03-14T09:26:53Z");

    for body in [
        wrong_type,
        missing,
        bad_time,
        payload("", json!(50), true),
        payload("Aphids", json!("50"), true),
    ] {
        let (status, response) = post(&router, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["status"], "error");
    }

    let (status, response) = post_json(&router, "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["status"], "error");

    let (_, health) = get(&router, "/api/health").await;
    assert_eq!(health["records"], 0);
}

#[tokio::test]
async fn test_legacy_field_names_accepted() {
    let router = router();
    let legacy = json!({
        "disease": "Powdery mildew",
        "confidence": 72.5,
        "sprinkle": true,
        "advice_en": "Improve air circulation.",
        "advice_hi": "हवा के संचार में सुधार करें।",
        "pesticide_en": "Sulfur",
        "pesticide_hi": "सल्फर",
        "timestamp": "2025-03-14 11:00:00"
    });

    let (status, _) = post(&router, legacy).await;
    assert_eq!(status, StatusCode::OK);

    let (_, latest) = get(&router, "/api/latest").await;
    assert_eq!(latest["category"], "Powdery mildew");
    assert_eq!(latest["treat"], true);
    assert_eq!(latest["captured_at"], "2025-03-14 11:00:00");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingest_keeps_every_record() {
    const N: usize = 50;
    let router = router();

    let requests = (0..N).map(|i| {
        let router = router.clone();
        async move { post(&router, payload("Aphids", json!(i as f64), true)).await }
    });
    let results = futures::future::join_all(requests).await;
    assert!(results.iter().all(|(status, _)| *status == StatusCode::OK));

    let (_, all) = get(&router, "/api/predictions").await;
    let mut confidences: Vec<u64> = all["predictions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["confidence"].as_f64().unwrap() as u64)
        .collect();
    confidences.sort_unstable();
    assert_eq!(confidences, (0..N as u64).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_csv_export() {
    let router = router();
    post(&router, payload("Aphids", json!(91.23), true)).await;
    post(&router, payload("Healthy", json!(99.0), false)).await;

    let (status, csv) = get_raw(&router, "/api/predictions.csv").await;
    assert_eq!(status, StatusCode::OK);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "captured_at,category,confidence,treat");
    assert_eq!(lines[1], "2025-03-14 09:26:53,Aphids,91.23,true");
    assert_eq!(lines[2], "2025-03-14 09:26:53,Healthy,99.00,false");
}

#[tokio::test]
async fn test_categories_table() {
    let (status, body) = get(&router(), "/api/categories").await;
    assert_eq!(status, StatusCode::OK);

    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 8);
    let army_worm = rows
        .iter()
        .find(|r| r["category"] == "Army worm")
        .unwrap();
    assert_eq!(army_worm["treat"], true);
    assert_eq!(army_worm["severity"], "High");
    assert!(!army_worm["description_secondary"].as_str().unwrap().is_empty());

    let healthy = rows.iter().find(|r| r["category"] == "Healthy").unwrap();
    assert_eq!(healthy["treat"], false);
    assert_eq!(healthy["severity"], "None");
}

#[tokio::test]
async fn test_health_reports_count_and_backend() {
    let router = router();
    post(&router, payload("Aphids", json!(1), true)).await;

    let (status, health) = get(&router, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["records"], 1);
    assert_eq!(health["backend"], "memory");
    assert_eq!(health["version"], cotton_core::VERSION);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let response = router()
        .oneshot(
            Request::get("/api/latest")
                .header(header::ORIGIN, "http://dashboard.local")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_surreal_backed_collector() {
    let history = SurrealHistory::in_memory().await.expect("surreal");
    let router = router_with(Arc::new(history));

    post(&router, payload("Aphids", json!(91.23), true)).await;
    post(&router, payload("Healthy", json!(99.0), false)).await;

    let (_, latest) = get(&router, "/api/latest").await;
    assert_eq!(latest["category"], "Healthy");
    let (_, health) = get(&router, "/api/health").await;
    assert_eq!(health["records"], 2);
    assert_eq!(health["backend"], "surreal");
}
