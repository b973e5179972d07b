use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use huddle_core::wire::SuccessResponse;
use thiserror::Error;

const MAX_CODE_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid room code '{0}'")]
    InvalidRoom(String),

    #[error("invalid participant id '{0}'")]
    InvalidParticipant(String),

    #[error("a participant cannot signal itself")]
    SelfAddressed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(SuccessResponse::failed(self.to_string())),
        )
            .into_response()
    }
}

fn valid_code(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_CODE_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
}

pub(crate) fn check_room(room: &str) -> Result<(), ApiError> {
    if valid_code(room) {
        Ok(())
    } else {
        Err(ApiError::InvalidRoom(room.to_owned()))
    }
}

pub(crate) fn check_participant(id: &str) -> Result<(), ApiError> {
    if valid_code(id) {
        Ok(())
    } else {
        Err(ApiError::InvalidParticipant(id.to_owned()))
    }
}
