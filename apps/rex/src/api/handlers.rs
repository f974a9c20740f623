//! HTTP handlers.
//!
//! Each handler authenticates the caller, moves the engine call onto the
//! blocking pool and runs it as one unit of work on the backend.

use super::AppState;
use super::auth::Authenticated;
use super::payload::{DeleteQuery, ForkBody, HealthResponse, PostView, PublishBody, SaveBody};
use crate::error::AppError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use rex_core::staging;
use rex_core::{
    ContentStore, DeleteOutcome, ForkOutcome, PostId, PublishOutcome, RexError, SaveOutcome,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Run a mutating engine call on the blocking pool.
async fn transact<T: Send + 'static>(
    state: &AppState,
    op: impl FnOnce(&mut dyn ContentStore) -> Result<T, RexError> + Send + 'static,
) -> Result<T, AppError> {
    let backend = Arc::clone(&state.backend);
    tokio::task::spawn_blocking(move || backend.transact(op)).await?
}

/// Run a read-only engine call on the blocking pool.
async fn read<T: Send + 'static>(
    state: &AppState,
    op: impl FnOnce(&dyn ContentStore) -> Result<T, RexError> + Send + 'static,
) -> Result<T, AppError> {
    let backend = Arc::clone(&state.backend);
    tokio::task::spawn_blocking(move || backend.read(op)).await?
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[instrument(skip_all, fields(user = %caller.user))]
pub async fn fork(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    payload: Result<Json<ForkBody>, JsonRejection>,
) -> Result<Json<ForkOutcome>, AppError> {
    let Json(body) = payload?;
    let status = body.target_status()?;
    let source_id = PostId(body.source_id);

    let outcome = transact(&state, move |store| {
        staging::fork(store, &caller, source_id, status)
    })
    .await?;

    info!(
        source = %source_id,
        id = %outcome.id,
        original = ?outcome.original_post_id,
        "forked"
    );
    Ok(Json(outcome))
}

#[instrument(skip_all, fields(user = %caller.user))]
pub async fn save(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    payload: Result<Json<SaveBody>, JsonRejection>,
) -> Result<Json<SaveOutcome>, AppError> {
    let Json(body) = payload?;
    let request = body.into_request()?;
    let target = request.id;

    let outcome = transact(&state, move |store| staging::save(store, &caller, request)).await?;

    if outcome.forked {
        info!(requested = ?target, id = %outcome.id, "save conflicted; forked");
    } else {
        info!(id = %outcome.id, "saved");
    }
    Ok(Json(outcome))
}

#[instrument(skip_all, fields(user = %caller.user))]
pub async fn publish(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    payload: Result<Json<PublishBody>, JsonRejection>,
) -> Result<Json<PublishOutcome>, AppError> {
    let Json(body) = payload?;
    let staging_id = PostId(body.staging_id);

    let outcome = transact(&state, move |store| {
        staging::publish(store, &caller, staging_id)
    })
    .await?;

    info!(
        staging = %staging_id,
        published = %outcome.published_id,
        used_original = outcome.used_original,
        "published"
    );
    Ok(Json(outcome))
}

#[instrument(skip_all, fields(user = %caller.user))]
pub async fn get_post(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<PostView>, AppError> {
    let Path(id) = id?;
    let item = read(&state, move |store| staging::read(store, &caller, PostId(id))).await?;
    Ok(Json(PostView::from(&item)))
}

#[instrument(skip_all, fields(user = %caller.user))]
pub async fn delete_post(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    id: Result<Path<u64>, PathRejection>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<DeleteOutcome>, AppError> {
    let Path(id) = id?;
    let Query(query) = query?;

    let outcome = transact(&state, move |store| {
        staging::delete(store, &caller, PostId(id), query.force)
    })
    .await?;

    info!(id = %outcome.id, hard = outcome.deleted, "deleted");
    Ok(Json(outcome))
}
