//! Participant turns.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, TurnRequest};
use crate::service::TurnReply;

/// `POST /api/turns` — run one interview turn and return the reply.
pub async fn send(
    State(ctx): State<ApiContext>,
    Json(req): Json<TurnRequest>,
) -> Result<Json<TurnReply>, ApiError> {
    req.validate()?;
    let reply = ctx.service.handle_turn(&req.participant_id, &req.message).await?;
    Ok(Json(reply))
}
