use thiserror::Error;

use crate::{IntoResponse, Response, StatusCode};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading a request or extracting data from it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed request: {0}")]
    Parse(String),

    #[error("request too large")]
    PayloadTooLarge,

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("transfer-encoding {0} is not supported")]
    UnsupportedTransferEncoding(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Parse(_) | Error::Json(_) | Error::BadRequest(_) => StatusCode::BadRequest,
            Error::PayloadTooLarge => StatusCode::PayloadTooLarge,
            Error::UnsupportedTransferEncoding(_) => StatusCode::NotImplemented,
            Error::Io(_) => StatusCode::InternalServerError,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        Response::json(
            self.status(),
            &serde_json::json!({ "message": self.to_string() }),
        )
    }
}
