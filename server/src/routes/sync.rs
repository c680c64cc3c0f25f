//! Sync endpoint routes.

use axum::{extract::State, routing::post, Json, Router};
use syncline_engine::{SyncRequest, SyncResponse};

use crate::error::Result;
use crate::handlers::handle_sync;
use crate::AppState;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sync", post(sync_handler))
}

/// POST /sync - Exchange pending changes for the authoritative state.
async fn sync_handler(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let response = handle_sync(&state, request).await?;
    Ok(Json(response))
}
