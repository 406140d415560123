//! Live seat-availability WebSocket.
//!
//! Clients authenticate with their session token in the query string,
//! then join per-train rooms. Joined rooms receive `seat-update` pushes
//! whenever the coordinator commits a seat change, and `viewer-count`
//! pushes whenever someone enters or leaves the room.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::api::auth;
use crate::db::models::User;
use crate::AppState;

#[derive(Deserialize)]
pub struct WsAuthQuery {
    token: Option<String>,
}

/// Messages a client may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinTrain { train_id: String },
    #[serde(rename_all = "camelCase")]
    LeaveTrain { train_id: String },
    Ping,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewerCount {
    pub train_id: String,
    pub count: i64,
}

/// Per-train viewer counts plus a broadcast channel so every open socket
/// watching a train learns when the count changes.
#[derive(Debug)]
pub struct ViewerRegistry {
    counts: DashMap<String, i64>,
    events: broadcast::Sender<ViewerCount>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            counts: DashMap::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewerCount> {
        self.events.subscribe()
    }

    pub fn count(&self, train_id: &str) -> i64 {
        self.counts.get(train_id).map(|c| *c).unwrap_or(0)
    }

    pub fn join(&self, train_id: &str) -> i64 {
        let count = {
            let mut entry = self.counts.entry(train_id.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        let _ = self.events.send(ViewerCount {
            train_id: train_id.to_string(),
            count,
        });
        count
    }

    pub fn leave(&self, train_id: &str) -> i64 {
        let count = match self.counts.get_mut(train_id) {
            Some(mut entry) => {
                *entry = (*entry - 1).max(0);
                *entry
            }
            None => 0,
        };
        if count == 0 {
            self.counts.remove_if(train_id, |_, c| *c == 0);
        }
        let _ = self.events.send(ViewerCount {
            train_id: train_id.to_string(),
            count,
        });
        count
    }
}

impl Default for ViewerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket endpoint for live train seat availability
/// GET /api/ws/trains?token=
pub async fn trains_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsAuthQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Browsers cannot set headers on WebSocket requests, so the session
    // token arrives as a query parameter instead.
    let token = match &query.token {
        Some(token) => token.clone(),
        None => return Err(StatusCode::UNAUTHORIZED),
    };
    let user = match auth::get_current_user(&state.db, &token).await {
        Ok(user) => user,
        Err(_) => return Err(StatusCode::UNAUTHORIZED),
    };

    Ok(ws.on_upgrade(move |socket| handle_train_stream(socket, state, user)))
}

async fn handle_train_stream(socket: WebSocket, state: Arc<AppState>, user: User) {
    let (mut sender, mut receiver) = socket.split();

    let mut seat_events = state.events.subscribe();
    let mut viewer_events = state.viewers.subscribe();
    let mut joined: HashSet<String> = HashSet::new();

    let connected_msg = serde_json::json!({
        "type": "connected",
        "user": user.name,
    });
    if sender
        .send(Message::Text(connected_msg.to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            // Seat changes committed by the coordinator
            update = seat_events.recv() => {
                match update {
                    Ok(update) if joined.contains(&update.train_id) => {
                        let msg = serde_json::json!({
                            "type": "seat-update",
                            "trainId": update.train_id,
                            "availableSeats": update.available_seats,
                            "totalSeats": update.total_seats,
                            "occupancyPercentage": update.occupancy_percentage,
                            "action": update.action,
                        });
                        if sender.send(Message::Text(msg.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Seat event subscriber lagged, updates dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Room occupancy changes from any socket
            count = viewer_events.recv() => {
                match count {
                    Ok(count) if joined.contains(&count.train_id) => {
                        let msg = serde_json::json!({
                            "type": "viewer-count",
                            "trainId": count.train_id,
                            "count": count.count,
                        });
                        if sender.send(Message::Text(msg.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Client messages: room management and keepalive
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::JoinTrain { train_id }) => {
                                if joined.insert(train_id.clone()) {
                                    state.viewers.join(&train_id);
                                } else {
                                    // Re-join of the same room just reports the count
                                    let msg = serde_json::json!({
                                        "type": "viewer-count",
                                        "trainId": train_id,
                                        "count": state.viewers.count(&train_id),
                                    });
                                    if sender.send(Message::Text(msg.to_string().into())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Ok(ClientMessage::LeaveTrain { train_id }) => {
                                if joined.remove(&train_id) {
                                    state.viewers.leave(&train_id);
                                }
                            }
                            Ok(ClientMessage::Ping) => {
                                if sender.send(Message::Text(r#"{"type":"pong"}"#.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Unparseable WebSocket message");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // A dropped connection leaves all its rooms
    for train_id in joined {
        state.viewers.leave(&train_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_registry_counts() {
        let registry = ViewerRegistry::new();
        assert_eq!(registry.count("t1"), 0);

        assert_eq!(registry.join("t1"), 1);
        assert_eq!(registry.join("t1"), 2);
        assert_eq!(registry.join("t2"), 1);
        assert_eq!(registry.count("t1"), 2);

        assert_eq!(registry.leave("t1"), 1);
        assert_eq!(registry.leave("t1"), 0);
        assert_eq!(registry.count("t1"), 0);

        // Leaving an empty room never goes negative
        assert_eq!(registry.leave("t1"), 0);
    }

    #[test]
    fn test_viewer_registry_broadcasts_changes() {
        let registry = ViewerRegistry::new();
        let mut rx = registry.subscribe();

        registry.join("t1");
        let event = rx.try_recv().unwrap();
        assert_eq!(event.train_id, "t1");
        assert_eq!(event.count, 1);

        registry.leave("t1");
        let event = rx.try_recv().unwrap();
        assert_eq!(event.count, 0);
    }

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join-train","trainId":"abc"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::JoinTrain { train_id } if train_id == "abc"));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"unknown"}"#).is_err());
    }
}
