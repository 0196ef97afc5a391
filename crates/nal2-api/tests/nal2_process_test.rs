use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use nal2::{Gateway, ReferenceEngine};
use nal2_api::{ApiConfig, AppState, build_app};
use serde_json::{Value, json};
use tower::util::ServiceExt;

/// Create a test application calling the reference engine in-process
fn create_test_app() -> axum::Router {
    let gateway = Gateway::builder("nal2-api")
        .in_process(ReferenceEngine::new().with_version(3, 1))
        .build()
        .unwrap();
    build_app(AppState::new(gateway, ApiConfig::default()))
}

/// Helper function to make JSON requests
async fn json_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    raw_request(app, method, uri, body).await
}

async fn raw_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: String,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_value: Value = if body_bytes.is_empty() {
        json!(null)
    } else {
        serde_json::from_slice(&body_bytes)
            .unwrap_or_else(|_| json!(String::from_utf8_lossy(&body_bytes).to_string()))
    };

    (status, body_value)
}

async fn call(app: &axum::Router, seq: i64, function: &str, input: Value) -> (StatusCode, Value) {
    json_request(
        app,
        "POST",
        "/api/nal2/process",
        Some(json!({"sequence_num": seq, "function": function, "input_parameters": input})),
    )
    .await
}

#[tokio::test]
async fn test_dll_version() {
    let app = create_test_app();

    let (status, body) = call(&app, 1, "dllVersion", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "sequence_num": 1,
            "function": "dllVersion",
            "return": 0,
            "output_parameters": {"major": 3, "minor": 1}
        })
    );
}

#[tokio::test]
async fn test_unknown_function_is_application_error() {
    let app = create_test_app();

    let (status, body) = call(&app, 42, "NoSuchFunction", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sequence_num"], 42);
    assert_eq!(body["return"], -1);
    assert_eq!(
        body["output_parameters"]["error"],
        "unimplemented function: NoSuchFunction"
    );
}

#[tokio::test]
async fn test_parameter_errors_name_the_key() {
    let app = create_test_app();

    let (status, body) = call(&app, 2, "GetMLE", json!({"aidType": 1, "direction": 0})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output_parameters"]["error"], "missing parameter: mic");

    let (_, body) = call(
        &app,
        3,
        "GetMLE",
        json!({"aidType": "behind", "direction": 0, "mic": 0}),
    )
    .await;
    assert_eq!(body["return"], -1);
    let message = body["output_parameters"]["error"].as_str().unwrap();
    assert!(message.contains("aidType"), "{}", message);
}

#[tokio::test]
async fn test_numeric_strings_are_coerced() {
    let app = create_test_app();

    let (status, body) = call(
        &app,
        4,
        "GetMLE",
        json!({"aidType": "1", "direction": 0.0, "mic": 0}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["return"], 0);
    assert!(body["output_parameters"]["MLE"].is_array());
}

#[tokio::test]
async fn test_missing_input_parameters() {
    let app = create_test_app();

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/nal2/process",
        Some(json!({"sequence_num": 5, "function": "dllVersion"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["return"], -1);
    assert_eq!(body["output_parameters"]["error"], "missing input parameters");
}

#[tokio::test]
async fn test_malformed_body_is_500_envelope() {
    let app = create_test_app();

    let (status, body) = raw_request(&app, "POST", "/api/nal2/process", "{not json".to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["return"], -1);
    assert!(body["output_parameters"]["error"].is_string());
    assert!(body.get("sequence_num").is_none());
}

#[tokio::test]
async fn test_derived_state_feeds_later_calls() {
    let app = create_test_app();

    let (_, body) = call(
        &app,
        6,
        "CrossOverFrequencies_NL2",
        json!({"channels": 3, "AC": [20, 30], "BC": [20, 30]}),
    )
    .await;
    assert_eq!(body["return"], 0);
    let cf_array = body["output_parameters"]["CFArray"].clone();

    let (status, snapshot) = json_request(&app, "GET", "/api/derived-state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["CFArray"], cf_array);
    assert_eq!(snapshot["FreqInCh"].as_array().unwrap().len(), 19);
    assert_eq!(snapshot["CT"], json!([]));

    // CFArray omitted: the cached crossovers are used
    let (_, body) = call(&app, 7, "CenterFrequencies", json!({"channels": 3})).await;
    assert_eq!(body["output_parameters"]["centreF"].as_array().unwrap().len(), 3);

    let (status, body) = json_request(&app, "DELETE", "/api/derived-state/CFArray", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = call(&app, 8, "CenterFrequencies", json!({"channels": 3})).await;
    assert_eq!(body["output_parameters"]["centreF"].as_array().unwrap().len(), 1);

    let (_, stats) = json_request(&app, "GET", "/api/derived-state/stats", None).await;
    assert_eq!(stats["cfArrayIsEmpty"], true);
    assert_eq!(stats["freqInChLength"], 19);

    let (status, _) = json_request(&app, "DELETE", "/api/derived-state", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, stats) = json_request(&app, "GET", "/api/derived-state/stats", None).await;
    assert_eq!(stats["freqInChIsEmpty"], true);
}

#[tokio::test]
async fn test_unknown_derived_slot_is_404() {
    let app = create_test_app();

    let (status, body) = json_request(&app, "DELETE", "/api/derived-state/Bogus", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_health() {
    let app = create_test_app();

    let (status, body) = json_request(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Server is running");
    assert_eq!(body["port"], 8080);
    assert_eq!(body["topology"], "in-process");
    assert!(
        body["apiEndpoint"]
            .as_str()
            .unwrap()
            .ends_with(":8080/api/nal2/process")
    );
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_app();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/nal2/process")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("DELETE"));
}

#[tokio::test]
async fn test_relay_routes_absent_in_process() {
    let app = create_test_app();

    let (status, _) = json_request(&app, "GET", "/api/history", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = json_request(&app, "GET", "/ws", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_and_openapi() {
    let app = create_test_app();

    let (status, body) = json_request(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("POST   /api/nal2/process"));
    assert!(!text.contains("/api/history"));

    let (status, doc) = json_request(&app, "GET", "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/nal2/process"]["post"].is_object());
}
