use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    NoContent,
    BadRequest,
    Forbidden,
    NotFound,
    PayloadTooLarge,
    InternalServerError,
    NotImplemented,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "200 OK",
            StatusCode::NoContent => "204 No Content",
            StatusCode::BadRequest => "400 Bad Request",
            StatusCode::Forbidden => "403 Forbidden",
            StatusCode::NotFound => "404 Not Found",
            StatusCode::PayloadTooLarge => "413 Payload Too Large",
            StatusCode::InternalServerError => "500 Internal Server Error",
            StatusCode::NotImplemented => "501 Not Implemented",
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.code() >= 500
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Vec::new())
    }

    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        Self::new(status, text.into()).with_header("Content-Type", "text/plain; charset=utf-8")
    }

    pub fn html(status: StatusCode, html: impl Into<String>) -> Self {
        Self::new(status, html.into()).with_header("Content-Type", "text/html; charset=utf-8")
    }

    pub fn json(status: StatusCode, data: &impl Serialize) -> Self {
        let response = match serde_json::to_vec(data) {
            Ok(body) => Self::new(status, body),
            Err(_) => Self::new(
                StatusCode::InternalServerError,
                &b"{\"message\":\"Failed to serialize JSON\"}"[..],
            ),
        };
        response.with_header("Content-Type", "application/json")
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Attach an HttpOnly cookie scoped to the whole site.
    pub fn with_cookie(self, name: &str, value: &str, max_age_secs: u64) -> Self {
        let cookie = format!("{name}={value}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}");
        self.with_header("Set-Cookie", &cookie)
    }

    pub fn clear_cookie(self, name: &str) -> Self {
        self.with_cookie(name, "", 0)
    }

    /// Serialize status line, headers and body for the wire.
    pub fn to_bytes(&self, keep_alive: bool) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {}\r\n", self.status.as_str());

        for (key, value) in &self.headers {
            if key.eq_ignore_ascii_case("content-length") || key.eq_ignore_ascii_case("connection") {
                continue;
            }
            head.push_str(&format!("{key}: {value}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str(if keep_alive {
            "Connection: keep-alive\r\n"
        } else {
            "Connection: close\r\n"
        });
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

impl Default for Response {
    fn default() -> Self {
        Response::empty(StatusCode::Ok)
    }
}
