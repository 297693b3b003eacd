use axum::{
    body::Bytes,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use thiserror::Error;

use crate::http::server::AppState;
use crate::routing::{decode_path, validate_entry, EntryError, RouteTable};
use crate::stats::PathStat;
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
pub struct AddTarget {
    pub path: String,
    pub target: String,
}

/// Admin request failures, each with its own status code.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Invalid request format")]
    BadRequest,

    #[error("{0}")]
    Entry(#[from] EntryError),

    #[error("Path already exists")]
    Duplicate,

    #[error("missing path")]
    MissingPath,

    #[error("route store failure: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::BadRequest | AdminError::MissingPath => StatusCode::BAD_REQUEST,
            AdminError::Entry(EntryError::Reserved) => StatusCode::FORBIDDEN,
            AdminError::Entry(_) => StatusCode::BAD_REQUEST,
            AdminError::Duplicate => StatusCode::CONFLICT,
            AdminError::Store(e) => {
                tracing::error!(error = %e, "Route store failure");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to access route store")
                    .into_response();
            }
        };
        (status, self.to_string()).into_response()
    }
}

pub async fn list_targets(State(state): State<AppState>) -> Result<Json<RouteTable>, AdminError> {
    let table = state.routes.load().await?;
    Ok(Json(table))
}

pub async fn add_target(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AdminError> {
    let AddTarget { path, target } =
        serde_json::from_slice(&body).map_err(|_| AdminError::BadRequest)?;
    validate_entry(&path, &target)?;

    state
        .routes
        .modify(|table| {
            if table.contains(&path) {
                return Err(AdminError::Duplicate);
            }
            table.insert(path.clone(), target.clone());
            Ok(())
        })
        .await?;

    tracing::info!(path = %path, target = %target, "Route added");
    Ok((StatusCode::CREATED, format!("Added route: {} → {}", path, target)))
}

pub async fn delete_target(State(state): State<AppState>, uri: Uri) -> Result<StatusCode, AdminError> {
    let rest = uri.path().strip_prefix("/targets/").unwrap_or_default();
    if rest.is_empty() {
        return Err(AdminError::MissingPath);
    }
    let path = format!("/{}", decode_path(rest));

    let removed = state
        .routes
        .modify(|table| Ok::<_, AdminError>(table.remove(&path).is_some()))
        .await?;

    // Counters outlive their route unless explicitly configured otherwise.
    if state.purge_stats_on_delete {
        state.stats.delete(&path);
    }

    tracing::info!(path = %path, removed, "Route deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_metrics(State(state): State<AppState>) -> Json<Vec<PathStat>> {
    Json(state.stats.all().into_values().collect())
}
