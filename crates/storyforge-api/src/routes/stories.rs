//! Routes for the Story context: job creation and complete-story reads.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use storyforge_core::ids::StoryId;
use storyforge_jobs::application::command_handlers::handle_create_story_job;
use storyforge_jobs::application::query_handlers::StoryJobView;
use storyforge_jobs::domain::commands::{CreateStoryJob, ExecuteStoryJob};
use storyforge_story::application::query_handlers::{self, CompleteStoryView};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::session;
use crate::state::AppState;

/// Request body for POST /create.
#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    /// Theme for the generated story.
    pub theme: String,
}

/// POST /create
///
/// Persists a `processing` job, schedules its execution and returns the job
/// without waiting for generation.
#[instrument(skip(state, headers, request))]
async fn create_story(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateStoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = session::session_id_from(&headers).unwrap_or_else(session::mint);
    let cookie = session::set_cookie(&session_id)?;

    let command = CreateStoryJob {
        correlation_id: Uuid::new_v4(),
        session_id,
        theme: request.theme,
    };
    let job = handle_create_story_job(&command, state.clock.as_ref(), &*state.job_repository)
        .await?;

    // Execution only starts once the job row exists, so a poll never misses it.
    drop(state.worker.spawn(ExecuteStoryJob {
        correlation_id: command.correlation_id,
        job_id: job.job_id,
        session_id: command.session_id,
        theme: command.theme,
    }));
    info!(job_id = %job.job_id, "story job scheduled");

    Ok(([(SET_COOKIE, cookie)], Json(StoryJobView::from(job))))
}

/// GET /{story_id}/complete
#[instrument(skip(state))]
async fn get_complete_story(
    State(state): State<AppState>,
    Path(story_id): Path<StoryId>,
) -> Result<Json<CompleteStoryView>, ApiError> {
    let view = query_handlers::get_complete_story(story_id, &*state.story_repository).await?;
    Ok(Json(view))
}

/// Returns the router for the story context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_story))
        .route("/{story_id}/complete", get(get_complete_story))
}
