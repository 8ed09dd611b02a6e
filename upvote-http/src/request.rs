use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::de::DeserializeOwned;

use crate::{Error, FromRequest, Json, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    PATCH,
    Unknown(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Unknown(s) => s,
        }
    }
}

impl From<&str> for Method {
    fn from(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            other => Method::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

#[derive(Debug, Clone)]
pub struct Uri {
    pub path: String,
    pub query: Option<HashMap<String, String>>,
}

impl Uri {
    pub fn new(path: &str, query: Option<HashMap<String, String>>) -> Self {
        Uri {
            path: String::from(path),
            query,
        }
    }

    /// Split a request target such as `/posts?page=2` into path and query map.
    pub fn parse(target: &str) -> Self {
        let Some((path, query_str)) = target.split_once('?') else {
            return Uri::new(target, None);
        };

        if query_str.is_empty() {
            return Uri::new(path, None);
        }

        let query = query_str
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();

        Uri::new(path, Some(query))
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    /// Header names are stored lowercased.
    pub headers: HashMap<String, Vec<String>>,
    pub body: Vec<u8>,
    pub remote_addr: Option<SocketAddr>,
    pub params: HashMap<String, String>,
}

impl Request {
    pub fn new(
        method: Method,
        uri: Uri,
        version: Version,
        headers: HashMap<String, Vec<String>>,
        body: Vec<u8>,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, values)| (name.to_ascii_lowercase(), values))
            .collect();

        Request {
            method,
            uri,
            version,
            headers,
            body,
            remote_addr,
            params: HashMap::new(),
        }
    }

    /// Get a route parameter by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Parse a route parameter, failing with a 400 when it is missing or malformed.
    pub fn param_as<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
    {
        let raw = self
            .param(name)
            .ok_or_else(|| Error::BadRequest(format!("Missing path parameter `{name}`")))?;
        raw.parse()
            .map_err(|_| Error::BadRequest(format!("Invalid path parameter `{name}`: {raw}")))
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())?
            .first()
            .map(String::as_str)
    }

    /// Value of a cookie sent in the `Cookie` header(s).
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get("cookie")?
            .iter()
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Deserialize the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Json::<T>::from_request(self).map(|Json(value)| value)
    }
}
