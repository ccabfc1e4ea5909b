//! Session lifecycle and record inspection.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{validate_participant_id, ApiContext};
use crate::models::InterviewRecord;

/// `DELETE /api/sessions/:participant_id` — end the interview.
///
/// Answers 204 whether or not there was anything to end.
pub async fn end(
    State(ctx): State<ApiContext>,
    Path(participant_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    validate_participant_id(&participant_id)?;
    let ended = ctx.service.end_interview(&participant_id).await?;
    if !ended {
        tracing::debug!(participant = %participant_id, "End requested with no interview");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/sessions/:participant_id/record` — live or stored record.
pub async fn record(
    State(ctx): State<ApiContext>,
    Path(participant_id): Path<String>,
) -> Result<Json<InterviewRecord>, ApiError> {
    validate_participant_id(&participant_id)?;
    let record = ctx.service.snapshot(&participant_id).await?;
    Ok(Json(record))
}
