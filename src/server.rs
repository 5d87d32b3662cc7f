//! HTTP glue: hand every request to a [`Handler`] and answer with a fixed body.

use std::io::Cursor;

use anyhow::{Result, anyhow};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use tiny_http::{Header, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::global::{self, SharedStore};
use crate::state::{Callback, State};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_BODY: &str = "Hello, world!";

/// Store key holding the pathname of the most recent request.
pub const LAST_PATHNAME_KEY: &str = "last_pathname";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body: String,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            body: DEFAULT_BODY.to_string(),
        }
    }
}

/// The parts of an incoming request a handler gets to see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingRequest {
    pub method: String,
    pub url: String,
    pub pathname: String,
    pub query: Option<String>,
}

impl IncomingRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let method = method.into();
        let url = url.into();
        let (path, query) = split_query(&url);
        let pathname = percent_decode_str(path).decode_utf8_lossy().into_owned();
        let query = query.map(str::to_string);
        Self {
            method,
            url,
            pathname,
            query,
        }
    }

    fn from_http(request: &Request) -> Self {
        Self::new(request.method().as_str(), request.url())
    }
}

/// Delegated request handler.
///
/// `next` passes control on; the returned string, if any, is the handler's
/// own result. The glue logs it but always answers with its configured body.
pub trait Handler {
    fn handle(&mut self, request: &IncomingRequest, next: &mut dyn FnMut()) -> Option<String>;
}

impl<F> Handler for F
where
    F: FnMut(&IncomingRequest, &mut dyn FnMut()) -> Option<String>,
{
    fn handle(&mut self, request: &IncomingRequest, next: &mut dyn FnMut()) -> Option<String> {
        self(request, next)
    }
}

/// Handler that only calls `next`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThrough;

impl Handler for PassThrough {
    fn handle(&mut self, _request: &IncomingRequest, next: &mut dyn FnMut()) -> Option<String> {
        next();
        None
    }
}

pub struct GlueServer<H> {
    handler: H,
    body: String,
    store: SharedStore,
    requests: State<u64>,
}

impl<H: Handler> GlueServer<H> {
    pub fn new(handler: H, body: impl Into<String>) -> Self {
        let requests = State::new(0);
        requests.subscribe(&Callback::new(|count: &u64| {
            debug!(count = *count, "request counter updated");
        }));
        Self {
            handler,
            body: body.into(),
            store: global::shared(),
            requests,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn requests(&self) -> &State<u64> {
        &self.requests
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Run one request through the handler and return the response body.
    pub fn dispatch(&mut self, request: &IncomingRequest) -> Result<String> {
        info!(method = %request.method, pathname = %request.pathname, "request");
        global::write(
            &self.store,
            LAST_PATHNAME_KEY,
            Value::String(request.pathname.clone()),
        )?;
        self.requests.set(self.requests.get() + 1);

        let mut next = || debug!("handling next request");
        match self.handler.handle(request, &mut next) {
            Some(result) => info!(%result, "handler result"),
            None => debug!("handler returned no result"),
        }
        Ok(self.body.clone())
    }
}

/// Bind `config.addr()` and serve requests until the listener closes.
pub fn serve<H: Handler>(config: &ServerConfig, handler: H) -> Result<()> {
    let addr = config.addr();
    let server = Server::http(&addr).map_err(|err| anyhow!("failed to bind {addr}: {err}"))?;
    info!("server running on http://{addr}");

    let mut glue = GlueServer::new(handler, config.body.clone());
    serve_requests(&server, &mut glue);
    Ok(())
}

/// Answer requests from `server` until it is unblocked or closed.
pub fn serve_requests<H: Handler>(server: &Server, glue: &mut GlueServer<H>) {
    for request in server.incoming_requests() {
        if let Err(err) = handle_request(glue, request) {
            warn!("error handling request: {err:#}");
        }
    }
}

fn handle_request<H: Handler>(glue: &mut GlueServer<H>, request: Request) -> Result<()> {
    let incoming = IncomingRequest::from_http(&request);
    let body = glue.dispatch(&incoming)?;
    request.respond(text_response(body)?)?;
    Ok(())
}

fn text_response(body: String) -> Result<Response<Cursor<Vec<u8>>>> {
    Ok(Response::from_string(body)
        .with_header(content_type("text/plain; charset=utf-8")?)
        .with_status_code(StatusCode(200)))
}

fn content_type(value: &str) -> Result<Header> {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes())
        .map_err(|_| anyhow!("invalid content type `{value}`"))
}

fn split_query(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}
