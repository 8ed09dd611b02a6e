use serde::de::DeserializeOwned;

use crate::{Error, Request, Response, Result};

/// Extract a typed value from a parsed request.
pub trait FromRequest: Sized {
    fn from_request(req: &Request) -> Result<Self>;
}

/// JSON request body.
#[derive(Debug)]
pub struct Json<T>(pub T);

impl<T> FromRequest for Json<T>
where
    T: DeserializeOwned,
{
    fn from_request(req: &Request) -> Result<Self> {
        if req.body.is_empty() {
            return Err(Error::BadRequest("Request body is empty".into()));
        }
        let value = serde_json::from_slice(&req.body)?;
        Ok(Json(value))
    }
}

/// Conversion of handler return values into a [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl<R, E> IntoResponse for std::result::Result<R, E>
where
    R: IntoResponse,
    E: IntoResponse,
{
    fn into_response(self) -> Response {
        match self {
            Ok(ok) => ok.into_response(),
            Err(err) => err.into_response(),
        }
    }
}
