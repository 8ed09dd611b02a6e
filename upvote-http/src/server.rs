use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::{Error, Handler, Method, Request, Response, Result, Router, StatusCode, Uri, Version};

const MAX_HEADERS: usize = 64;
const MAX_HEAD_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);
const EMFILE: i32 = 24;

type SharedHandler<S> = Arc<dyn Handler<S>>;

pub struct Server<S> {
    pub(crate) router: Router<SharedHandler<S>>,
    pub(crate) state: S,
}

impl<S> Server<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(state: S) -> Self {
        Server {
            router: Router::new(),
            state,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn route<H>(mut self, method: Method, path: &str, handler: H) -> Self
    where
        H: Handler<S> + 'static,
    {
        self.router.add_route(method, path, Arc::new(handler));
        self
    }

    /// Register every route of `configurator` under `prefix`.
    pub fn scope<F>(mut self, prefix: &str, configurator: F) -> Self
    where
        F: FnOnce(ServerScope<S>) -> ServerScope<S>,
    {
        let scope = configurator(ServerScope {
            prefix: prefix.trim_end_matches('/').to_string(),
            routes: Vec::new(),
        });

        for (method, path, handler) in scope.routes {
            let full_path = format!("{}{}", scope.prefix, path);
            self.router.add_route(method, &full_path, handler);
        }

        self
    }

    pub fn get<H: Handler<S> + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Method::GET, path, handler)
    }

    pub fn post<H: Handler<S> + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Method::POST, path, handler)
    }

    pub fn put<H: Handler<S> + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Method::PUT, path, handler)
    }

    pub fn delete<H: Handler<S> + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Method::DELETE, path, handler)
    }

    /// Route a parsed request and run its handler.
    pub async fn dispatch(&self, mut request: Request) -> Response {
        let started = Instant::now();
        let method = request.method.clone();
        let path = request.uri.path.clone();

        let response = match self.router.find(&method, &path) {
            Some((handler, params)) => {
                request.params = params;
                handler.call(request, self.state.clone()).await
            }
            None => Response::text(StatusCode::NotFound, "Not Found"),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let status = response.status.code();
        if response.status.is_server_error() {
            error!(%method, %path, status, elapsed_ms, "request failed");
        } else {
            info!(%method, %path, status, elapsed_ms, "request");
        }

        response
    }

    pub async fn listen(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "listening");
        self.serve(listener, std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let server = Arc::new(self);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, remote_addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "failed to accept connection");
                            let pause = accept_backoff(&e);
                            if !pause.is_zero() {
                                tokio::time::sleep(pause).await;
                            }
                            continue;
                        }
                    };
                    let _ = socket.set_nodelay(true);

                    let server = Arc::clone(&server);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(socket, remote_addr).await {
                            warn!(%remote_addr, error = %e, "connection handler error");
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_connection(&self, mut socket: TcpStream, remote_addr: SocketAddr) -> Result<()> {
        let mut buf = BytesMut::with_capacity(4096);

        loop {
            let (request, keep_alive) = match read_request(&mut socket, &mut buf, remote_addr).await {
                Ok(Some(parsed)) => parsed,
                Ok(None) => return Ok(()),
                Err(e) => {
                    let response = Response::json(
                        e.status(),
                        &serde_json::json!({ "message": e.to_string() }),
                    );
                    socket.write_all(&response.to_bytes(false)).await?;
                    return Err(e);
                }
            };

            let response = self.dispatch(request).await;
            socket.write_all(&response.to_bytes(keep_alive)).await?;

            if !keep_alive {
                return Ok(());
            }
        }
    }
}

/// Read one request from the socket. `Ok(None)` means the peer closed the
/// connection between requests.
async fn read_request(
    socket: &mut TcpStream,
    buf: &mut BytesMut,
    remote_addr: SocketAddr,
) -> Result<Option<(Request, bool)>> {
    loop {
        if let Some(head_len) = find_header_end(buf) {
            let (method, target, version, headers, content_length, keep_alive) =
                parse_head(&buf[..head_len])?;

            if content_length > MAX_BODY_BYTES {
                return Err(Error::PayloadTooLarge);
            }

            let _ = buf.split_to(head_len);
            while buf.len() < content_length {
                if socket.read_buf(buf).await? == 0 {
                    return Err(Error::Parse("connection closed mid-body".into()));
                }
            }
            let body = buf.split_to(content_length).to_vec();

            let request = Request::new(
                method,
                Uri::parse(&target),
                version,
                headers,
                body,
                Some(remote_addr),
            );
            debug!(method = %request.method, path = %request.uri.path, "parsed request");
            return Ok(Some((request, keep_alive)));
        }

        if buf.len() > MAX_HEAD_BYTES {
            return Err(Error::PayloadTooLarge);
        }

        if socket.read_buf(buf).await? == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err(Error::Parse("connection closed mid-head".into()))
            };
        }
    }
}

type Head = (Method, String, Version, HashMap<String, Vec<String>>, usize, bool);

fn parse_head(raw: &[u8]) -> Result<Head> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut headers);

    match parsed.parse(raw) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => return Err(Error::Parse("incomplete request head".into())),
        Err(e) => return Err(Error::Parse(e.to_string())),
    }

    let method = Method::from(parsed.method.unwrap_or("GET"));
    let target = parsed.path.unwrap_or("/").to_string();
    let version = match parsed.version {
        Some(0) => Version::Http10,
        _ => Version::Http11,
    };

    let mut keep_alive = version == Version::Http11;
    let mut content_length = 0;
    let mut header_map: HashMap<String, Vec<String>> = HashMap::with_capacity(parsed.headers.len());

    for header in parsed.headers.iter() {
        let value = std::str::from_utf8(header.value)
            .map_err(|_| Error::Parse(format!("non UTF-8 value for header {}", header.name)))?;

        if header.name.eq_ignore_ascii_case("content-length") {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| Error::Parse(format!("invalid content-length: {value}")))?;
        } else if header.name.eq_ignore_ascii_case("transfer-encoding") {
            // bodies are only framed by content-length
            return Err(Error::UnsupportedTransferEncoding(value.trim().to_string()));
        } else if header.name.eq_ignore_ascii_case("connection") {
            keep_alive = value.eq_ignore_ascii_case("keep-alive");
        }

        header_map
            .entry(header.name.to_ascii_lowercase())
            .or_default()
            .push(value.to_string());
    }

    Ok((method, target, version, header_map, content_length, keep_alive))
}

/// Out of descriptors: give in-flight connections a moment to close.
fn accept_backoff(e: &std::io::Error) -> Duration {
    if e.raw_os_error() == Some(EMFILE) {
        ACCEPT_BACKOFF
    } else {
        Duration::ZERO
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Builder for a group of routes sharing a path prefix
pub struct ServerScope<S> {
    prefix: String,
    routes: Vec<(Method, String, SharedHandler<S>)>,
}

impl<S> ServerScope<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn route<H>(mut self, method: Method, path: &str, handler: H) -> Self
    where
        H: Handler<S> + 'static,
    {
        self.routes.push((method, path.to_string(), Arc::new(handler)));
        self
    }

    pub fn get<H: Handler<S> + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Method::GET, path, handler)
    }

    pub fn post<H: Handler<S> + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Method::POST, path, handler)
    }

    pub fn put<H: Handler<S> + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Method::PUT, path, handler)
    }

    pub fn delete<H: Handler<S> + 'static>(self, path: &str, handler: H) -> Self {
        self.route(Method::DELETE, path, handler)
    }
}
