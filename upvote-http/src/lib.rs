//! Minimal HTTP/1.1 layer for the upvote application.
//!
//! A [`Server`] owns a route table and an application state value `S` that is
//! cloned into every handler call. Handlers are plain async functions
//! `async fn(Request, S) -> impl IntoResponse`.

mod error;
mod extract;
mod macros;
mod request;
mod response;
mod router;
mod serve;
mod server;


pub use error::{Error, Result};
pub use extract::{FromRequest, IntoResponse, Json};
pub use request::{Method, Request, Uri, Version};
pub use response::{Response, StatusCode};
pub use router::Router;
pub use serve::{serve_file, serve_static};
pub use server::{Server, ServerScope};

#[cfg(any(test, feature = "testing"))]
pub use test::{TestClient, TestRequest, TestResponse};

use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A routable request handler bound to application state `S`.
pub trait Handler<S>: Send + Sync {
    fn call(&self, req: Request, state: S) -> BoxFuture<Response>;
}

impl<F, Fut, R, S> Handler<S> for F
where
    F: Fn(Request, S) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, req: Request, state: S) -> BoxFuture<Response> {
        let fut = self(req, state);
        Box::pin(async move { fut.await.into_response() })
    }
}
