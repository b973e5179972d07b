use crate::api::AppState;
use crate::api::error::{ApiError, check_participant, check_room};
use axum::Json;
use axum::extract::{Path, State};
use huddle_core::utils::now_millis;
use huddle_core::wire::{DrainResponse, SendSignalRequest, SuccessResponse};
use huddle_core::{ParticipantId, RoomCode, Signal};
use tracing::debug;

pub async fn send_signal(
    State(state): State<AppState>,
    Json(req): Json<SendSignalRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    check_room(req.room.as_str())?;
    check_participant(req.from_participant.as_str())?;
    check_participant(req.to_participant.as_str())?;
    if req.from_participant == req.to_participant {
        return Err(ApiError::SelfAddressed);
    }

    // Nobody drains the mailbox of a non-member, so its queue would never
    // be freed. Report success anyway; the sender has nothing to retry.
    if !state.rosters.is_member(&req.room, &req.to_participant) {
        debug!(
            room = %req.room,
            from = %req.from_participant,
            to = %req.to_participant,
            "Signal addressed to a non-member, dropping"
        );
        return Ok(Json(SuccessResponse::ok()));
    }

    let signal = Signal {
        from: req.from_participant,
        message: req.message,
        timestamp: req.timestamp.unwrap_or_else(now_millis),
    };
    state.mailbox.enqueue(&req.room, &req.to_participant, signal);

    Ok(Json(SuccessResponse::ok()))
}

pub async fn drain_signals(
    State(state): State<AppState>,
    Path((room, participant)): Path<(String, String)>,
) -> Result<Json<DrainResponse>, ApiError> {
    check_room(&room)?;
    check_participant(&participant)?;

    let room = RoomCode::from(room);
    let participant = ParticipantId::from(participant);

    state.rosters.touch(&room, &participant);
    let signals = state.mailbox.drain(&room, &participant);

    Ok(Json(DrainResponse {
        success: true,
        signals,
    }))
}
