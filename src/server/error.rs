use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

pub type AppResult<T> = Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// upstream unreachable or answered with a non 2xx
    #[error("upstream transport failed: {0}")]
    Transport(String),

    /// malformed json or a date that doesn't match the feed format
    #[error("failed to parse upstream data: {0}")]
    Parse(String),

    /// provider answered the hash api with a non success code
    #[error("provider rejected credentials: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal server error: {0}")]
    InternalServerErrorWithContext(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // the player can't do anything useful with an upstream error, so anything that leaves
        // us with nothing to serve collapses into a plain 404
        let status = match &self {
            Error::Transport(_) | Error::Parse(_) | Error::Auth(_) | Error::NotFound(_) => {
                debug!("answering 404: {}", self);
                StatusCode::NOT_FOUND
            }
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::InternalServerErrorWithContext(_) => {
                error!("{}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match status {
            StatusCode::NOT_FOUND => "Not Found".to_string(),
            _ => self.to_string(),
        };

        (
            status,
            [
                (header::CONTENT_TYPE, "text/plain"),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            ],
            body,
        )
            .into_response()
    }
}
