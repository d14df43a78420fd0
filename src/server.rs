//! HTTP front-end.
//!
//! `GET /` renders a form with one field per bundled column, `POST /` answers
//! it with an HTML page, `POST /predict` takes the same record as JSON, and
//! `GET /health` reports liveness.

use crate::error::PredictError;
use crate::predictor::{Outcome, Predictor};
use crate::schema::FeatureSpec;
use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    started: Instant,
}

impl AppState {
    pub fn new(predictor: Predictor) -> Self {
        Self {
            predictor: Arc::new(predictor),
            started: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// JSON envelope for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            request_id: request_id.to_string(),
        }
    }

    pub fn error(message: &str, request_id: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
            request_id: request_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub columns: usize,
}

fn request_id() -> String {
    format!("req-{:016x}", rand::random::<u64>())
}

/// HTTP status for a rejected request.
pub fn status_for(err: &PredictError) -> StatusCode {
    match err {
        PredictError::MissingColumn(_) => StatusCode::BAD_REQUEST,
        PredictError::UnknownCategory { .. } | PredictError::InvalidNumeric { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PredictError::ClassifierContract(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn run_prediction<R>(state: &AppState, record: &R, req_id: &str) -> Result<Outcome, PredictError>
where
    R: crate::predictor::Record + ?Sized,
{
    let result = state.predictor.predict(record);
    match &result {
        Ok(outcome) => debug!("{req_id}: predicted {outcome}"),
        Err(e @ PredictError::ClassifierContract(_)) => error!("{req_id}: {e}"),
        Err(e) => debug!("{req_id}: rejected: {e}"),
    }
    result
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(submit_form))
        .route("/predict", post(predict_json))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Serves until Ctrl-C.
pub async fn serve(state: AppState, address: SocketAddr) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|source| ServerError::Bind { address, source })?;
    info!("Serving predictions on http://{address}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {e}");
    }
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let health = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        columns: state.predictor.columns().len(),
    };
    (StatusCode::OK, Json(health))
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&state.predictor, None))
}

pub async fn submit_form(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> (StatusCode, Html<String>) {
    let req_id = request_id();
    let result = run_prediction(&state, &fields, &req_id);
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => status_for(e),
    };
    (status, Html(render_page(&state.predictor, Some(&result))))
}

pub async fn predict_json(
    State(state): State<AppState>,
    Json(payload): Json<HashMap<String, Value>>,
) -> (StatusCode, Json<ApiResponse<PredictionResponse>>) {
    let req_id = request_id();
    let record = stringify_values(payload);

    match run_prediction(&state, &record, &req_id) {
        Ok(outcome) => {
            let response = PredictionResponse {
                label: outcome.to_string(),
            };
            (StatusCode::OK, Json(ApiResponse::success(response, &req_id)))
        }
        Err(e) => (
            status_for(&e),
            Json(ApiResponse::error(&e.to_string(), &req_id)),
        ),
    }
}

/// JSON numbers and booleans become their text form; `null` counts as absent.
fn stringify_values(payload: HashMap<String, Value>) -> HashMap<String, String> {
    payload
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect()
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Student Performance Predictor</title>
<style>
body { font-family: sans-serif; max-width: 520px; margin: 40px auto; }
label { display: block; margin-top: 12px; }
input, select { width: 100%; padding: 6px; }
.result { margin-top: 20px; font-size: 1.4em; }
.error { margin-top: 20px; color: #b00020; }
</style>
</head>
<body>
<h1>Student Performance Predictor</h1>
<form method="post" action="/">
"#;

const PAGE_TAIL: &str = r#"<button type="submit">Predict</button>
</form>
"#;

fn render_page(predictor: &Predictor, result: Option<&Result<Outcome, PredictError>>) -> String {
    let mut page = String::from(PAGE_HEAD);
    for feature in &predictor.bundle().schema().features {
        let name = escape_html(&feature.name);
        page.push_str(&format!("<label>{name}\n"));
        match predictor.bundle().label_encoder(&feature.name) {
            Some(encoder) => {
                page.push_str(&format!("<select name=\"{name}\" required>\n"));
                page.push_str("<option value=\"\" disabled selected>Select...</option>\n");
                for class in encoder.classes() {
                    let class = escape_html(class);
                    page.push_str(&format!("<option value=\"{class}\">{class}</option>\n"));
                }
                page.push_str("</select>\n");
            }
            None => page.push_str(&number_input(&name, feature)),
        }
        page.push_str("</label>\n");
    }
    page.push_str(PAGE_TAIL);
    match result {
        Some(Ok(outcome)) => {
            page.push_str(&format!("<div class=\"result\">Prediction: {outcome}</div>\n"));
        }
        Some(Err(e)) => {
            let message = escape_html(&e.to_string());
            page.push_str(&format!("<div class=\"error\">{message}</div>\n"));
        }
        None => {}
    }
    page.push_str("</body>\n</html>\n");
    page
}

/// Numeric field carrying the declared range as browser-side bounds.
fn number_input(name: &str, feature: &FeatureSpec) -> String {
    let mut input = format!("<input type=\"number\" step=\"any\" name=\"{name}\"");
    if let Some(min) = feature.min {
        input.push_str(&format!(" min=\"{min}\""));
    }
    if let Some(max) = feature.max {
        input.push_str(&format!(" max=\"{max}\""));
    }
    match (feature.min, feature.max) {
        (Some(min), Some(max)) => {
            input.push_str(&format!(" placeholder=\"{min} to {max}\""));
        }
        _ => input.push_str(&format!(" placeholder=\"{name}\"")),
    }
    input.push_str(" required>\n");
    input
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
