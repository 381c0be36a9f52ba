//! Router integration tests: requests in, rendered pages and JSON out.

use std::path::Path;
use std::sync::OnceLock;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use churn_data::{ChurnModel, TrainerConfig};
use churn_web::{ModelHandle, router};
use tower::ServiceExt;

const SAMPLE: [f64; 13] = [
    0.0, 0.0, 10.0, 0.0, 1000.0, 50.0, 10.0, 5.0, 2.0, 1.0, 1.0, 30.0, 500.0,
];

fn model() -> &'static ChurnModel {
    static MODEL: OnceLock<ChurnModel> = OnceLock::new();
    MODEL.get_or_init(|| {
        let data = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("churn_small.csv");
        TrainerConfig::new().train(&data).unwrap().model
    })
}

fn handle() -> ModelHandle {
    ModelHandle::new(model().clone())
}

async fn send(request: Request<Body>) -> Response {
    router(handle()).oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn post_json(value: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap()
}

fn sample_form() -> String {
    SAMPLE
        .iter()
        .enumerate()
        .map(|(i, v)| format!("f{i}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_redirects_to_input() {
    let response = send(get("/")).await;
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/input");
}

#[tokio::test]
async fn input_page_has_one_control_per_field() {
    let response = send(get("/input")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    for i in 0..13 {
        assert!(html.contains(&format!("name=\"f{i}\"")), "missing f{i}");
    }
    assert!(!html.contains("name=\"f13\""));
    assert!(html.contains("Customer Value"));
    assert!(html.contains("href=\"/visualisasi\""));
    assert!(!html.contains("class=\"verdict"));
}

#[tokio::test]
async fn visualisasi_embeds_tree() {
    let response = send(get("/visualisasi")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<svg"));
    assert!(html.contains("samples = 168"));
}

#[tokio::test]
async fn tree_svg_is_served_raw() {
    let response = send(get("/tree.svg")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    let svg = body_text(response).await;
    assert!(svg.starts_with("<svg"));
    assert_eq!(svg.matches("<rect").count(), model().tree().n_nodes());
}

// ---------------------------------------------------------------------------
// Form prediction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sample_vector_renders_one_consistent_verdict() {
    let response = send(post_form(sample_form())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    let churn = html.contains("class=\"verdict churn\"");
    let not_churn = html.contains("class=\"verdict not-churn\"");
    assert!(churn ^ not_churn, "expected exactly one verdict");

    let expected = model().predict(&SAMPLE).unwrap();
    assert_eq!(churn, expected.prediction == 1);
    assert!(html.contains(&format!(">{}</p>", expected.label)));
}

#[tokio::test]
async fn submitted_values_are_kept() {
    let html = body_text(send(post_form(sample_form())).await).await;
    assert!(html.contains("value=\"1000\""));
    assert!(html.contains("value=\"500\""));
}

#[tokio::test]
async fn invalid_form_reports_each_field() {
    let mut fields: Vec<String> = SAMPLE
        .iter()
        .enumerate()
        .map(|(i, v)| format!("f{i}={v}"))
        .collect();
    fields[2] = "f2=-1".to_string();
    fields[4] = "f4=abc".to_string();
    fields[9] = "f9=3".to_string();
    fields.pop();

    let response = send(post_form(fields.join("&"))).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("must be at least 0"));
    assert!(html.contains("is not a number"));
    assert!(html.contains("must be one of 1, 2"));
    assert!(html.contains("a value is required"));
    assert!(!html.contains("class=\"verdict"));
}

// ---------------------------------------------------------------------------
// JSON API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_predict_matches_model() {
    let response = send(post_json(serde_json::json!({ "features": SAMPLE }))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();

    let expected = model().predict(&SAMPLE).unwrap();
    assert_eq!(value["prediction"], expected.prediction);
    assert_eq!(value["label"], expected.label.to_string());
    let p = value["probability"].as_f64().unwrap();
    assert!((p - expected.probability).abs() < 1e-12);
}

#[tokio::test]
async fn api_accepts_string_values() {
    let strings: Vec<String> = SAMPLE.iter().map(|v| v.to_string()).collect();
    let response = send(post_json(serde_json::json!({ "features": strings }))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_rejects_wrong_length() {
    let response = send(post_json(serde_json::json!({ "features": [1, 2, 3] }))).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(value["error"], "expected 13 features, got 3");
}

#[tokio::test]
async fn api_reports_invalid_fields() {
    let mut features = serde_json::json!(SAMPLE);
    features[11] = serde_json::json!(-4);
    let response = send(post_json(serde_json::json!({ "features": features }))).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(value["fields"][0]["index"], 11);
    assert_eq!(value["fields"][0]["column"], "Age");
}
