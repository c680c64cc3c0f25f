//! Sync handler - runs one request through the engine.

use crate::error::{AppError, Result};
use crate::AppState;
use syncline_engine::{SyncRequest, SyncResponse};

/// Process a sync request from a client.
///
/// The engine is synchronous and takes per-item locks, so the request runs
/// on the blocking pool instead of a runtime worker.
pub async fn handle_sync(state: &AppState, request: SyncRequest) -> Result<SyncResponse> {
    let lists = request.change_lists.len();
    if lists > state.config.max_change_lists {
        return Err(AppError::BadRequest(format!(
            "Too many change lists: {} (limit {})",
            lists, state.config.max_change_lists
        )));
    }

    let server = state.server.clone();
    let response = tokio::task::spawn_blocking(move || server.synchronize(request))
        .await
        .map_err(|e| AppError::Internal(format!("sync task failed: {}", e)))??;

    tracing::info!(
        "Sync: {} change lists in, {} items out, checkpoint {}",
        lists,
        response.changes.len(),
        response.timestamp
    );

    Ok(response)
}
