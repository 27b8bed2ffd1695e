/*!
Stub miner HTTP server for tests without hardware

Serves `/cgi-bin/stats.cgi` with axum on a random local port behind an
HTTP Digest challenge, the way the miner's lighttpd does. The `response=`
field is checked against the stub's password (RFC 2617, `qop=auth`), so a
client with the wrong password, realm, nonce or uri is rejected.

Every request is recorded, and the number of requests being served at
the same time is tracked, so tests can assert on what the client sent.
*/

use anyhow::Result;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use md5::{Digest, Md5};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const STATS_PATH: &str = "/cgi-bin/stats.cgi";
pub const REALM: &str = "antMiner Configuration";
const NONCE: &str = "6a1f2ef5d4b3c2a1e0f9d8c7b6a59483";

/// What the stub answers once the client is authenticated
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// 200 with this body
    Body(String),
    /// Arbitrary status with a plain-text body
    Status(u16, String),
    /// 200 with this body, after a delay
    Delayed(Duration, String),
    /// Accept the connection and never answer
    Silent,
}

/// A request as seen by the stub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

impl RecordedRequest {
    /// `username="..."` field of the Digest header, if any
    pub fn digest_username(&self) -> Option<String> {
        let auth = DigestAuthorization::parse(self.authorization.as_deref()?)?;
        auth.field("username").map(str::to_string)
    }
}

/// Fields of an `Authorization: Digest ...` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestAuthorization {
    fields: HashMap<String, String>,
}

impl DigestAuthorization {
    /// `None` unless the header uses the Digest scheme
    pub fn parse(header: &str) -> Option<Self> {
        let rest = header.trim().strip_prefix("Digest ")?;
        let mut fields = HashMap::new();
        let mut chars = rest.chars().peekable();

        loop {
            while matches!(chars.peek(), Some(c) if *c == ',' || c.is_whitespace()) {
                chars.next();
            }
            let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
            if key.is_empty() {
                break;
            }

            let value = if chars.peek() == Some(&'"') {
                chars.next();
                let mut value = String::new();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => value.extend(chars.next()),
                        '"' => break,
                        c => value.push(c),
                    }
                }
                value
            } else {
                let raw: String = chars.by_ref().take_while(|c| *c != ',').collect();
                raw.trim().to_string()
            };
            fields.insert(key.trim().to_ascii_lowercase(), value);
        }

        Some(Self { fields })
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The `response=` a client knowing `password` must send for `method`
    pub fn expected_response(&self, method: &str, password: &str) -> Option<String> {
        let ha1 = md5_hex(&format!(
            "{}:{}:{}",
            self.field("username")?,
            self.field("realm")?,
            password
        ));
        let ha2 = md5_hex(&format!("{}:{}", method, self.field("uri")?));
        let nonce = self.field("nonce")?;

        let response = match self.field("qop") {
            Some(qop) => md5_hex(&format!(
                "{ha1}:{nonce}:{}:{}:{qop}:{ha2}",
                self.field("nc")?,
                self.field("cnonce")?
            )),
            None => md5_hex(&format!("{ha1}:{nonce}:{ha2}")),
        };
        Some(response)
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

#[derive(Debug)]
struct StubState {
    username: String,
    password: String,
    response: StubResponse,
    requests: Mutex<Vec<RecordedRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubState {
    fn accepts(&self, auth: &DigestAuthorization, method: &str, path: &str) -> bool {
        auth.field("username") == Some(self.username.as_str())
            && auth.field("realm") == Some(REALM)
            && auth.field("nonce") == Some(NONCE)
            && auth.field("uri") == Some(path)
            && auth.expected_response(method, &self.password).as_deref() == auth.field("response")
    }
}

/// Counts a request as in flight until dropped
struct InFlight<'a>(&'a StubState);

impl<'a> InFlight<'a> {
    fn enter(state: &'a StubState) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Running stub miner. The server task stops when this is dropped.
pub struct StubMiner {
    addr: SocketAddr,
    state: Arc<StubState>,
    task: JoinHandle<()>,
}

impl StubMiner {
    /// Starts a stub accepting Digest credentials `username`/`password`
    pub async fn start<U, P>(username: U, password: P, response: StubResponse) -> Result<Self>
    where
        U: Into<String>,
        P: Into<String>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(StubState {
            username: username.into(),
            password: password.into(),
            response,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });

        let app = build_router(state.clone());
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::warn!("[STUB] server stopped: {}", e);
            }
        });

        log::info!("[STUB] miner listening on {}", addr);
        Ok(Self { addr, state, task })
    }

    /// Serves `body` with a 200 once authenticated as `root`/`root`
    pub async fn serving(body: impl Into<String>) -> Result<Self> {
        Self::start("root", "root", StubResponse::Body(body.into())).await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Requests that carried a Digest `Authorization` header
    pub fn authenticated_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.authorization.is_some())
            .collect()
    }

    /// Highest number of requests served at the same time
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for StubMiner {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn build_router(state: Arc<StubState>) -> Router {
    Router::new()
        .route(STATS_PATH, get(stats))
        .layer(middleware::from_fn_with_state(state.clone(), require_digest))
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .with_state(state)
}

async fn record_request(State(state): State<Arc<StubState>>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        authorization: request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    log::debug!("[STUB] {} {}", recorded.method, recorded.path);
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(recorded);
    }

    let _in_flight = InFlight::enter(&state);
    next.run(request).await
}

async fn require_digest(State(state): State<Arc<StubState>>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(DigestAuthorization::parse)
        .is_some_and(|auth| state.accepts(&auth, request.method().as_str(), request.uri().path()));

    if !authorized {
        let challenge = format!("Digest realm=\"{REALM}\", nonce=\"{NONCE}\", qop=\"auth\"");
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, challenge)],
            "Unauthorized",
        )
            .into_response();
    }
    next.run(request).await
}

async fn stats(State(state): State<Arc<StubState>>) -> Response {
    match &state.response {
        StubResponse::Body(body) => (StatusCode::OK, body.clone()).into_response(),
        StubResponse::Status(code, body) => {
            let status = StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, body.clone()).into_response()
        }
        StubResponse::Delayed(delay, body) => {
            tokio::time::sleep(*delay).await;
            (StatusCode::OK, body.clone()).into_response()
        }
        StubResponse::Silent => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}
