//! Server-Sent Events transport.
//!
//! A client opens `GET /sse` and receives an `endpoint` event naming the URL to
//! POST its JSON-RPC messages to (`/messages?sessionId=<id>`). Responses are
//! pushed back on the stream as `message` events. The session lives exactly as
//! long as the stream.

use super::{ApiError, ApiResult};
use crate::config::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use scaffold_mcp::protocol::JsonRpcResponse;
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
const SESSION_BUFFER: usize = 64;

struct Session {
    sender: mpsc::Sender<JsonRpcResponse>,
    connected_at: DateTime<Utc>,
}

/// Live SSE sessions keyed by session id
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and return its id with the receiving end
    pub fn open(&self) -> (String, mpsc::Receiver<JsonRpcResponse>) {
        let (sender, receiver) = mpsc::channel(SESSION_BUFFER);
        let session_id = Uuid::new_v4().to_string();

        self.lock().insert(
            session_id.clone(),
            Session {
                sender,
                connected_at: Utc::now(),
            },
        );

        (session_id, receiver)
    }

    pub fn sender(&self, session_id: &str) -> Option<mpsc::Sender<JsonRpcResponse>> {
        self.lock().get(session_id).map(|s| s.sender.clone())
    }

    pub fn close(&self, session_id: &str) {
        if let Some(session) = self.lock().remove(session_id) {
            let duration = Utc::now() - session.connected_at;
            tracing::info!(
                "SSE connection {} closed after {}s",
                session_id,
                duration.num_seconds()
            );
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its session from the registry when the stream is dropped
struct SessionGuard {
    registry: Arc<SessionRegistry>,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.close(&self.session_id);
    }
}

/// GET /sse
pub async fn open_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session_id, receiver) = state.sessions.open();
    tracing::info!("New SSE connection {}", session_id);

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={}", session_id));

    let guard = SessionGuard {
        registry: state.sessions.clone(),
        session_id,
    };

    let messages = stream::unfold(
        (ReceiverStream::new(receiver), guard),
        |(mut receiver, guard)| async move {
            let response = receiver.next().await?;
            Some((Ok(message_event(&response)), (receiver, guard)))
        },
    );

    let events = stream::once(async move { Ok(endpoint) }).chain(messages);

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

fn message_event(response: &JsonRpcResponse) -> Event {
    match serde_json::to_string(response) {
        Ok(json) => Event::default().event("message").data(json),
        Err(e) => {
            tracing::error!("Failed to serialize response: {}", e);
            Event::default().comment("serialization failed")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// POST /messages?sessionId=<id>
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> ApiResult<StatusCode> {
    let session_id = query
        .session_id
        .ok_or_else(|| ApiError::bad_request("Missing sessionId query parameter"))?;

    let sender = state
        .sessions
        .sender(&session_id)
        .ok_or_else(|| ApiError::not_found(format!("Session not found: {}", session_id)))?;

    if let Some(response) = state.mcp.handle_line(&body).await {
        sender
            .send(response)
            .await
            .map_err(|_| ApiError::not_found(format!("Session closed: {}", session_id)))?;
    }

    Ok(StatusCode::ACCEPTED)
}
