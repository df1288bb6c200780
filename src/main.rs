/// Inference shell for the trained pipeline

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::{Method, StatusCode},
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use gtd_ml::{PipelineError, PredictRequest, TrainedPipeline};

#[derive(Clone)]
struct AppState {
    // loaded once at start, read-only for every request
    pipeline: Arc<TrainedPipeline>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let model_path = std::env::var("MODEL_PATH").unwrap_or_else(|_| "model.json".to_string());
    let pipeline = match TrainedPipeline::load(Path::new(&model_path)) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!("Failed to load pipeline from {model_path}: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Loaded pipeline trained at {} on {} rows",
        pipeline.metadata().trained_at,
        pipeline.metadata().training_rows
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(predict_json))
        .layer(cors)
        .with_state(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], 8000));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    tracing::info!("Server listening on http://0.0.0.0:8000");
    axum::serve(listener, app).await.unwrap();
}

async fn index() -> Html<String> {
    Html(render_page(None))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn predict_form(
    State(state): State<AppState>,
    Form(request): Form<PredictRequest>,
) -> Result<Html<String>, (StatusCode, String)> {
    let outcome = state
        .pipeline
        .predict_request(&request)
        .map_err(into_http_error)?;
    Ok(Html(render_page(Some(outcome.label()))))
}

async fn predict_json(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let outcome = state
        .pipeline
        .predict_request(&request)
        .map_err(into_http_error)?;
    Ok(Json(serde_json::json!({
        "label": outcome.label(),
        "code": outcome.code(),
    })))
}

fn into_http_error(error: PipelineError) -> (StatusCode, String) {
    match error {
        PipelineError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
        other => {
            tracing::error!("Prediction failed: {other}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        }
    }
}

fn render_page(result: Option<&str>) -> String {
    let result_block = match result {
        Some(label) => format!("<p class=\"result\">Predicted outcome: <b>{label}</b></p>"),
        None => String::new(),
    };
    PAGE_TEMPLATE.replace("{result}", &result_block)
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Attack Outcome Prediction</title></head>
<body>
<h1>Attack Outcome Prediction</h1>
{result}
<form method="post" action="/predict">
  <label>Country <input name="country"></label><br>
  <label>Region <input name="region"></label><br>
  <label>Duration &gt; 24h (0/1) <input name="duration"></label><br>
  <label>City <input name="city"></label><br>
  <label>Multiple attack (0/1) <input name="multiple"></label><br>
  <label>Attack type <input name="attack_type"></label><br>
  <label>Target type <input name="target_type"></label><br>
  <label>Weapon type <input name="weapon"></label><br>
  <label>Kid held hostage (-9/0/1) <input name="kid_hostage"></label><br>
  <label>Group name <input name="group"></label><br>
  <button type="submit">Predict</button>
</form>
</body>
</html>
"#;
