//! WebSocket handler for real-time table updates.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{table_id}?player_id=<id>`
//! 2. Server subscribes to the table's event channel and sends the current
//!    snapshot as a first `game_update` frame
//! 3. Every committed change is forwarded as a `game_update` frame
//! 4. A seated client may send commands over the same socket; each gets
//!    one `TableResponse` frame back
//!
//! Broadcast snapshots never carry hole cards; only the first frame shows the
//! connecting player's own cards.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/1?player_id=7');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === "game_update") {
//!     render(data.state);
//!   } else {
//!     handleResponse(data);
//!   }
//! };
//!
//! ws.send(JSON.stringify({
//!   type: "action",
//!   action: { type: "raise", amount: 100 }
//! }));
//! ```

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use poker_room::game::{Action, PlayerId};
use poker_room::table::{TableEvent, TableHandle, TableResponse};
use poker_room::wallet::TableId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{debug, info, warn};

use super::{AppState, tables::table_error};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub player_id: Option<PlayerId>,
}

/// Commands accepted from a connected player.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Action { action: Action },
    Leave,
}

/// Frames that are neither snapshots nor command answers.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerNotice {
    Error { message: String },
}

/// Upgrade to a WebSocket streaming `game_update` frames for one table.
///
/// Answers `404` for unknown tables before upgrading.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(table_id): Path<TableId>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let table = match state.table_manager.get_table(table_id).await {
        Ok(table) => table,
        Err(e) => return table_error(e).into_response(),
    };
    let events = match state.table_manager.subscribe(table_id).await {
        Ok(events) => events,
        Err(e) => return table_error(e).into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, table, events, query.player_id))
}

async fn handle_socket(
    socket: WebSocket,
    table: TableHandle,
    mut events: Receiver<TableEvent>,
    player_id: Option<PlayerId>,
) {
    let table_id = table.table_id();
    let (mut sender, mut receiver) = socket.split();
    info!(table_id, ?player_id, "WebSocket connected");

    // The subscription is already live, so nothing committed after this
    // snapshot can be missed.
    match snapshot_frame(&table, player_id).await {
        Some(frame) => {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                return;
            }
        }
        None => return,
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let frame = match event {
                    Ok(event) => serde_json::to_string(&event).ok(),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(table_id, skipped, "subscriber lagged, resending snapshot");
                        snapshot_frame(&table, player_id).await
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(frame) = frame else { break };
                if sender.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(table_id, error = %e, "WebSocket receive failed");
                        break;
                    }
                };
                let reply = handle_client_message(&table, player_id, text.as_str()).await;
                if sender.send(Message::Text(reply.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!(table_id, ?player_id, "WebSocket disconnected");
}

async fn snapshot_frame(table: &TableHandle, player_id: Option<PlayerId>) -> Option<String> {
    let state = table.state(player_id).await.ok()?;
    let event = TableEvent::GameUpdate {
        table_id: table.table_id(),
        state,
    };
    serde_json::to_string(&event).ok()
}

async fn handle_client_message(table: &TableHandle, player_id: Option<PlayerId>, text: &str) -> String {
    let Some(player_id) = player_id else {
        return notice("Connect with ?player_id= to send commands");
    };
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => return notice(&format!("Malformed message: {e}")),
    };

    let result = match message {
        ClientMessage::Action { action } => table.place_bet(player_id, action).await,
        ClientMessage::Leave => table.leave(player_id).await,
    };
    let response = result.unwrap_or_else(|e| TableResponse::error(e.to_string()));
    serde_json::to_string(&response).unwrap_or_else(|e| notice(&e.to_string()))
}

fn notice(message: &str) -> String {
    let notice = ServerNotice::Error {
        message: message.to_string(),
    };
    serde_json::to_string(&notice).unwrap_or_default()
}
