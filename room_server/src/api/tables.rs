//! Table management API handlers.
//!
//! Every command is forwarded to the table's actor through its
//! [`TableHandle`](poker_room::TableHandle). The actor's [`TableResponse`] is
//! returned as the JSON body, with the HTTP status derived from its variant.
//!
//! # Examples
//!
//! Sit down:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tables/1/sit \
//!   -H "Content-Type: application/json" \
//!   -d '{"player_id": 7, "display_name": "alice", "seat": 0, "buy_in": 5000}'
//! ```
//!
//! Raise by 200:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tables/1/action \
//!   -H "Content-Type: application/json" \
//!   -d '{"player_id": 7, "action": {"type": "raise", "amount": 200}}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use poker_room::game::{Action, Chips, GameState, PlayerId, SeatIndex};
use poker_room::table::{TableError, TableResponse, TableSummary};
use poker_room::wallet::TableId;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::logging::log_table_command;

#[derive(Debug, Deserialize)]
pub struct SitDownRequest {
    pub player_id: PlayerId,
    pub display_name: String,
    pub seat: SeatIndex,
    pub buy_in: Chips,
}

#[derive(Debug, Deserialize)]
pub struct PlayerRequest {
    pub player_id: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct TakeActionRequest {
    pub player_id: PlayerId,
    pub action: Action,
}

#[derive(Debug, Deserialize)]
pub struct RebuyRequest {
    pub player_id: PlayerId,
    pub amount: Chips,
}

#[derive(Debug, Deserialize)]
pub struct AwardRequest {
    pub winners: Vec<SeatIndex>,
}

#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    pub player_id: Option<PlayerId>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a lookup or mailbox failure to an HTTP error.
pub(crate) fn table_error(err: TableError) -> ApiError {
    let status = match err {
        TableError::NotFound(_) => StatusCode::NOT_FOUND,
        TableError::Closed(_) => StatusCode::GONE,
        TableError::Duplicate(_) | TableError::SeatCountMismatch { .. } => StatusCode::CONFLICT,
        TableError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        TableError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// HTTP status for an actor's answer.
pub fn response_status(response: &TableResponse) -> StatusCode {
    match response {
        TableResponse::Success | TableResponse::SuccessWithMessage { .. } => StatusCode::OK,
        TableResponse::SeatTaken { .. }
        | TableResponse::NotYourTurn
        | TableResponse::HandInProgress => StatusCode::CONFLICT,
        TableResponse::NotAtTable => StatusCode::NOT_FOUND,
        TableResponse::InsufficientChips { .. }
        | TableResponse::InvalidAction { .. }
        | TableResponse::Error { .. } => StatusCode::BAD_REQUEST,
        TableResponse::PersistenceFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn respond(
    table_id: TableId,
    command: &str,
    player_id: Option<PlayerId>,
    result: Result<TableResponse, TableError>,
) -> Response {
    match result {
        Ok(response) => {
            log_table_command(table_id, command, player_id, response.is_success());
            (response_status(&response), Json(response)).into_response()
        }
        Err(e) => table_error(e).into_response(),
    }
}

/// List all running tables.
pub async fn list_tables(State(state): State<AppState>) -> Json<Vec<TableSummary>> {
    Json(state.table_manager.list_tables().await)
}

/// Snapshot of one table. Hole cards are hidden except those of the
/// `player_id` given in the query string.
pub async fn get_table(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<GameState>, ApiError> {
    let table = state.table_manager.get_table(table_id).await.map_err(table_error)?;
    let snapshot = table.state(query.player_id).await.map_err(table_error)?;
    Ok(Json(snapshot))
}

pub async fn sit_down(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
    Json(request): Json<SitDownRequest>,
) -> Response {
    let table = match state.table_manager.get_table(table_id).await {
        Ok(table) => table,
        Err(e) => return table_error(e).into_response(),
    };
    let result = table
        .sit_down(
            request.player_id,
            request.display_name,
            request.seat,
            request.buy_in,
        )
        .await;
    respond(table_id, "sit", Some(request.player_id), result)
}

pub async fn leave_table(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
    Json(request): Json<PlayerRequest>,
) -> Response {
    let table = match state.table_manager.get_table(table_id).await {
        Ok(table) => table,
        Err(e) => return table_error(e).into_response(),
    };
    let result = table.leave(request.player_id).await;
    respond(table_id, "leave", Some(request.player_id), result)
}

/// Apply a betting action for the player whose turn it is.
pub async fn take_action(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
    Json(request): Json<TakeActionRequest>,
) -> Response {
    let table = match state.table_manager.get_table(table_id).await {
        Ok(table) => table,
        Err(e) => return table_error(e).into_response(),
    };
    let result = table.place_bet(request.player_id, request.action).await;
    respond(table_id, "action", Some(request.player_id), result)
}

pub async fn rebuy(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
    Json(request): Json<RebuyRequest>,
) -> Response {
    let table = match state.table_manager.get_table(table_id).await {
        Ok(table) => table,
        Err(e) => return table_error(e).into_response(),
    };
    let result = table.rebuy(request.player_id, request.amount).await;
    respond(table_id, "rebuy", Some(request.player_id), result)
}

pub async fn start_hand(State(state): State<AppState>, Path(table_id): Path<TableId>) -> Response {
    let table = match state.table_manager.get_table(table_id).await {
        Ok(table) => table,
        Err(e) => return table_error(e).into_response(),
    };
    respond(table_id, "start", None, table.start_hand().await)
}

/// Split the pot between the winning seats once the hand is at showdown.
pub async fn award_pot(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
    Json(request): Json<AwardRequest>,
) -> Response {
    let table = match state.table_manager.get_table(table_id).await {
        Ok(table) => table,
        Err(e) => return table_error(e).into_response(),
    };
    respond(table_id, "award", None, table.award_pot(request.winners).await)
}
