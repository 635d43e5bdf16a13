//! In-process stand-in for the carpark API, for tests.
//!
//! Serves the collection endpoint and `?facility=<id>` lookups from
//! in-memory JSON, counts hits per endpoint, and can be told to answer the
//! next few requests with a canned status.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::Value;

/// A canned reply that overrides the stored data once.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Empty body with this status
    Status(u16),
    /// 200 with this raw body
    Raw(String),
    /// 200 with this JSON body
    Json(Value),
}

#[derive(Debug, Default)]
struct FakeState {
    directory: Option<Value>,
    details: HashMap<String, Value>,
    directory_replies: VecDeque<Reply>,
    detail_replies: HashMap<String, VecDeque<Reply>>,
    directory_hits: usize,
    detail_hits: HashMap<String, usize>,
    last_authorization: Option<String>,
}

/// Handle to a running fake upstream.
#[derive(Debug, Clone)]
pub struct FakeUpstream {
    addr: SocketAddr,
    state: Arc<Mutex<FakeState>>,
}

impl FakeUpstream {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let app = Router::new()
            .route("/carpark", get(serve))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Base URL to configure the client with.
    pub fn base_url(&self) -> String {
        format!("http://{}/carpark", self.addr)
    }

    pub fn set_directory(&self, directory: Value) {
        self.lock().directory = Some(directory);
    }

    pub fn set_detail(&self, facility_id: &str, detail: Value) {
        self.lock().details.insert(facility_id.to_string(), detail);
    }

    /// Answer the next directory request with `reply`.
    pub fn push_directory_reply(&self, reply: Reply) {
        self.lock().directory_replies.push_back(reply);
    }

    /// Answer the next request for `facility_id` with `reply`.
    pub fn push_detail_reply(&self, facility_id: &str, reply: Reply) {
        self.lock()
            .detail_replies
            .entry(facility_id.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn directory_hits(&self) -> usize {
        self.lock().directory_hits
    }

    pub fn detail_hits(&self, facility_id: &str) -> usize {
        self.lock()
            .detail_hits
            .get(facility_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_detail_hits(&self) -> usize {
        self.lock().detail_hits.values().sum()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.lock().last_authorization.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

async fn serve(
    State(state): State<Arc<Mutex<FakeState>>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().unwrap();
    state.last_authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match params.get("facility") {
        None => {
            state.directory_hits += 1;
            let reply = state
                .directory_replies
                .pop_front()
                .or_else(|| state.directory.clone().map(Reply::Json))
                .unwrap_or(Reply::Status(404));
            render(reply)
        }
        Some(id) => {
            *state.detail_hits.entry(id.clone()).or_default() += 1;
            let queued = state.detail_replies.get_mut(id).and_then(VecDeque::pop_front);
            let reply = queued
                .or_else(|| state.details.get(id).cloned().map(Reply::Json))
                .unwrap_or(Reply::Status(404));
            render(reply)
        }
    }
}

fn render(reply: Reply) -> Response {
    match reply {
        Reply::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        Reply::Raw(body) => (StatusCode::OK, body).into_response(),
        Reply::Json(value) => axum::Json(value).into_response(),
    }
}
