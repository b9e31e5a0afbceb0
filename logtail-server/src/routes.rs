//! HTTP routes: deployment pages and the JSON API.

use axum::Router;
use axum::extract::State;
use axum::response::{Html, Json, Redirect};
use axum::routing::{get, post};
use minijinja::context;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;
use crate::stream::deployment_logs;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/deployments", get(list_deployments));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/deployment", post(create_deployment))
        .route("/deployment/{token}", get(deployment_logs))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct DeploymentEntry {
    token: String,
    status: &'static str,
}

#[derive(Serialize)]
struct DeploymentsResponse {
    deployments: Vec<DeploymentEntry>,
}

fn deployment_entries(state: &AppState) -> Result<Vec<DeploymentEntry>, ApiError> {
    let entries = state
        .deployer
        .list()?
        .into_iter()
        .map(|summary| DeploymentEntry {
            token: summary.token.to_string(),
            status: summary.status.map_or("unknown", |s| s.as_str()),
        })
        .collect();
    Ok(entries)
}

/// GET / - HTML list of deployments with a form to start a new one.
async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let deployments = deployment_entries(&state)?;
    let page = state
        .templates
        .get_template("index.html")?
        .render(context! { deployments })?;
    Ok(Html(page))
}

/// GET /api/deployments - known deployments and their producer status.
async fn list_deployments(
    State(state): State<AppState>,
) -> Result<Json<DeploymentsResponse>, ApiError> {
    let deployments = deployment_entries(&state)?;
    Ok(Json(DeploymentsResponse { deployments }))
}

/// POST /deployment - start a deployment and redirect to its log stream.
async fn create_deployment(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let token = state.deployer.start().await?;
    info!(token = %token, "deployment started");
    Ok(Redirect::to(&format!("/deployment/{token}")))
}
