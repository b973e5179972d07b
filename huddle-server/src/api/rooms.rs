use crate::api::error::{ApiError, check_participant, check_room};
use crate::api::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use huddle_core::wire::{
    CallStatusRequest, JoinRequest, LeaveRequest, RosterQuery, RosterResponse, SuccessResponse,
};
use huddle_core::{Participant, RoomCode};

pub async fn join_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<RosterResponse>, ApiError> {
    check_room(&room)?;
    check_participant(req.participant.as_str())?;

    let room = RoomCode::from(room);
    let display_name = if req.display_name.is_empty() {
        req.participant.to_string()
    } else {
        req.display_name
    };

    let roster = state
        .rosters
        .join(&room, Participant::new(req.participant, display_name));

    Ok(Json(RosterResponse {
        success: true,
        roster,
    }))
}

pub async fn leave_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(req): Json<LeaveRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    check_room(&room)?;
    check_participant(req.participant.as_str())?;

    let room = RoomCode::from(room);
    state.rosters.leave(&room, &req.participant);
    state.mailbox.purge(&room, &req.participant);

    Ok(Json(SuccessResponse::ok()))
}

pub async fn set_call_status(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(req): Json<CallStatusRequest>,
) -> Result<Json<RosterResponse>, ApiError> {
    check_room(&room)?;
    check_participant(req.participant.as_str())?;

    let room = RoomCode::from(room);
    let roster = state
        .rosters
        .set_call_status(&room, &req.participant, req.active);

    // Anything still queued predates the call status change.
    state.mailbox.purge(&room, &req.participant);

    Ok(Json(RosterResponse {
        success: true,
        roster,
    }))
}

pub async fn get_roster(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Query(query): Query<RosterQuery>,
) -> Result<Json<RosterResponse>, ApiError> {
    check_room(&room)?;

    let room = RoomCode::from(room);
    if let Some(participant) = &query.participant {
        state.rosters.touch(&room, participant);
    }

    Ok(Json(RosterResponse {
        success: true,
        roster: state.rosters.snapshot(&room),
    }))
}
