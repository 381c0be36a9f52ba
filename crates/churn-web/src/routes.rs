//! HTTP routes for the predictor.

use std::collections::HashMap;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use churn_data::FieldError;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::handle::ModelHandle;
use crate::views::{FormState, input_page, visualisasi_page};

/// Build the predictor router around a loaded model.
///
/// | Route | Response |
/// |---|---|
/// | `GET /` | redirect to `/input` |
/// | `GET /input` | prediction form |
/// | `POST /predict` | form with verdict, or 422 with field errors |
/// | `GET /visualisasi` | tree drawing page |
/// | `GET /tree.svg` | raw SVG |
/// | `POST /api/predict` | JSON verdict, or 422 with JSON errors |
pub fn router(handle: ModelHandle) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/input", get(input))
        .route("/predict", post(predict_form))
        .route("/visualisasi", get(visualisasi))
        .route("/tree.svg", get(tree_svg))
        .route("/api/predict", post(predict_json))
        .with_state(handle)
}

async fn index() -> Redirect {
    Redirect::to("/input")
}

async fn input(State(handle): State<ModelHandle>) -> Html<String> {
    Html(input_page(handle.model(), &FormState::default()).into_string())
}

#[instrument(skip_all)]
async fn predict_form(
    State(handle): State<ModelHandle>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let model = handle.model();
    let values: Vec<Option<String>> = (0..model.schema().len())
        .map(|i| form.get(&format!("f{i}")).cloned())
        .collect();

    let features = match model.encode_inputs(&values) {
        Ok(features) => features,
        Err(errors) => {
            warn!(n_errors = errors.len(), "rejected form input");
            let state = FormState {
                values: &values,
                errors: &errors,
                prediction: None,
            };
            let page = input_page(model, &state).into_string();
            return (StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response();
        }
    };

    match model.predict(&features) {
        Ok(prediction) => {
            debug!(prediction = prediction.prediction, "form prediction");
            let state = FormState {
                values: &values,
                errors: &[],
                prediction: Some(&prediction),
            };
            Html(input_page(model, &state).into_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "prediction failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn visualisasi(State(handle): State<ModelHandle>) -> Html<String> {
    Html(visualisasi_page(handle.model(), handle.tree_svg()).into_string())
}

async fn tree_svg(State(handle): State<ModelHandle>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "image/svg+xml")],
        handle.tree_svg().to_string(),
    )
}

/// Body of `POST /api/predict`: values in schema order, as numbers or strings.
#[derive(Debug, Deserialize)]
struct PredictRequest {
    features: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct FieldProblem {
    index: usize,
    column: String,
    message: String,
}

impl From<&FieldError> for FieldProblem {
    fn from(e: &FieldError) -> Self {
        Self {
            index: e.index,
            column: e.column.clone(),
            message: e.error.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    fields: Vec<FieldProblem>,
}

fn unprocessable(error: String, fields: Vec<FieldProblem>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiError { error, fields }),
    )
        .into_response()
}

/// Raw text of a JSON value; `None` for null, arrays, and objects.
fn raw_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(u8::from(*b).to_string()),
        _ => None,
    }
}

#[instrument(skip_all, fields(n_values = request.features.len()))]
async fn predict_json(
    State(handle): State<ModelHandle>,
    Json(request): Json<PredictRequest>,
) -> Response {
    let model = handle.model();
    let expected = model.schema().len();
    if request.features.len() != expected {
        warn!(expected, got = request.features.len(), "wrong feature count");
        return unprocessable(
            format!(
                "expected {expected} features, got {}",
                request.features.len()
            ),
            Vec::new(),
        );
    }

    let values: Vec<Option<String>> = request.features.iter().map(raw_value).collect();
    let features = match model.encode_inputs(&values) {
        Ok(features) => features,
        Err(errors) => {
            warn!(n_errors = errors.len(), "rejected API input");
            return unprocessable(
                "invalid input".to_string(),
                errors.iter().map(FieldProblem::from).collect(),
            );
        }
    };

    match model.predict(&features) {
        Ok(prediction) => Json(prediction).into_response(),
        Err(e) => {
            error!(error = %e, "prediction failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_from_json() {
        assert_eq!(raw_value(&serde_json::json!(10)), Some("10".into()));
        assert_eq!(raw_value(&serde_json::json!(2.5)), Some("2.5".into()));
        assert_eq!(raw_value(&serde_json::json!(" 3 ")), Some(" 3 ".into()));
        assert_eq!(raw_value(&serde_json::json!(null)), None);
        assert_eq!(raw_value(&serde_json::json!([1])), None);
    }
}
