//! Informational routes: service identity and liveness. Neither touches the database.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

pub const WELCOME_MESSAGE: &str = "Welcome to SplitSphere API";

#[derive(Serialize)]
struct RootBody {
    app: String,
    version: String,
    message: &'static str,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn root(State(state): State<AppState>) -> Json<RootBody> {
    Json(RootBody {
        app: state.settings.project_name.clone(),
        version: state.settings.project_version.clone(),
        message: WELCOME_MESSAGE,
    })
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

/// GET / and GET /health.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
}
