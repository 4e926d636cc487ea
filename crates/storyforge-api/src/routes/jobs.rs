//! Routes for the Story Job context.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use storyforge_core::ids::JobId;
use storyforge_jobs::application::query_handlers::{self, StoryJobView};
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /{job_id}
#[instrument(skip(state))]
async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> Result<Json<StoryJobView>, ApiError> {
    let view = query_handlers::get_job_by_id(job_id, &*state.job_repository).await?;
    Ok(Json(view))
}

/// Returns the router for the job context.
pub fn router() -> Router<AppState> {
    Router::new().route("/{job_id}", get(get_job))
}
