//! Table actor implementation with async message handling.
//!
//! Every command runs against a clone of the current snapshot. The clone is
//! persisted with the next version number and only then swapped in and
//! published, so a failed write leaves the table exactly as it was.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::{
    config::TableConfig,
    events::{EventPublisher, TableEvent},
    manager::TableError,
    messages::{TableMessage, TableResponse, TableSummary, payout_message},
    timer::TurnTimer,
};
use crate::db::repository::{SeatRecord, SeatRecordStatus, StoreError, TableStore, WalletStore};
use crate::game::{
    actions::default_action,
    blinds::BlindsManager,
    entities::{Action, Chips, PlayerId, Seat, SeatIndex},
    hand::{HandProgress, apply_action, award_pot, start_hand},
    seating::{LeaveOutcome, add_chips, leave_seat, sit_down},
    state::GameState,
};
use crate::wallet::{EntryType, TableId, Transfer, WalletError};

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    table_id: TableId,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(sender: mpsc::Sender<TableMessage>, table_id: TableId) -> Self {
        Self { sender, table_id }
    }

    /// Get table ID
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> Result<(), TableError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TableError::Closed(self.table_id))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> TableMessage,
    ) -> Result<T, TableError> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| TableError::Closed(self.table_id))
    }

    pub async fn sit_down(
        &self,
        player_id: PlayerId,
        display_name: impl Into<String>,
        seat: SeatIndex,
        buy_in: Chips,
    ) -> Result<TableResponse, TableError> {
        let display_name = display_name.into();
        self.request(|response| TableMessage::SitDown {
            player_id,
            display_name,
            seat,
            buy_in,
            response,
        })
        .await
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<TableResponse, TableError> {
        self.request(|response| TableMessage::LeaveSeat {
            player_id,
            response,
        })
        .await
    }

    pub async fn place_bet(
        &self,
        player_id: PlayerId,
        action: Action,
    ) -> Result<TableResponse, TableError> {
        self.request(|response| TableMessage::PlaceBet {
            player_id,
            action,
            response,
        })
        .await
    }

    pub async fn rebuy(&self, player_id: PlayerId, amount: Chips) -> Result<TableResponse, TableError> {
        self.request(|response| TableMessage::Rebuy {
            player_id,
            amount,
            response,
        })
        .await
    }

    pub async fn start_hand(&self) -> Result<TableResponse, TableError> {
        self.request(|response| TableMessage::StartHand { response })
            .await
    }

    pub async fn award_pot(&self, winners: Vec<SeatIndex>) -> Result<TableResponse, TableError> {
        self.request(|response| TableMessage::AwardPot { winners, response })
            .await
    }

    /// Current snapshot, with hole cards hidden except the viewer's own.
    pub async fn state(&self, viewer: Option<PlayerId>) -> Result<GameState, TableError> {
        self.request(|response| TableMessage::GetState { viewer, response })
            .await
    }

    pub async fn summary(&self) -> Result<TableSummary, TableError> {
        self.request(|response| TableMessage::GetSummary { response })
            .await
    }

    pub async fn close(&self) -> Result<TableResponse, TableError> {
        self.request(|response| TableMessage::Close { response })
            .await
    }
}

/// Table actor managing a single poker table
pub struct TableActor {
    /// Table ID
    id: TableId,

    /// Table configuration
    config: TableConfig,

    blinds: BlindsManager,

    /// Last persisted snapshot
    state: GameState,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    store: Arc<dyn TableStore>,

    /// Wallets for buy-ins, rebuys and cash-outs
    wallet: Arc<dyn WalletStore>,

    events: Arc<dyn EventPublisher>,

    timer: TurnTimer,

    /// Is table closed
    is_closed: bool,
}

impl TableActor {
    /// Create a new table actor around `state`, which is either a fresh
    /// table or a snapshot restored from the store.
    pub fn new(
        id: TableId,
        config: TableConfig,
        state: GameState,
        store: Arc<dyn TableStore>,
        wallet: Arc<dyn WalletStore>,
        events: Arc<dyn EventPublisher>,
    ) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(100);
        let timer = TurnTimer::new(sender.downgrade(), config.action_timeout());
        let blinds = BlindsManager::new(config.blinds());

        let actor = Self {
            id,
            config,
            blinds,
            state,
            inbox,
            store,
            wallet,
            events,
            timer,
            is_closed: false,
        };

        (actor, TableHandle::new(sender, id))
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        log::info!("Table {} '{}' starting", self.id, self.config.name);
        self.sync_timer(true);

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message).await;
            if self.is_closed {
                break;
            }
        }

        self.timer.cancel();
        log::info!("Table {} '{}' closed", self.id, self.config.name);
    }

    async fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::SitDown {
                player_id,
                display_name,
                seat,
                buy_in,
                response,
            } => {
                let result = self
                    .handle_sit_down(player_id, display_name, seat, buy_in)
                    .await;
                let _ = response.send(result);
            }

            TableMessage::LeaveSeat {
                player_id,
                response,
            } => {
                let result = self.handle_leave(player_id).await;
                let _ = response.send(result);
            }

            TableMessage::PlaceBet {
                player_id,
                action,
                response,
            } => {
                let result = self.handle_action(player_id, action).await;
                let _ = response.send(result);
            }

            TableMessage::Rebuy {
                player_id,
                amount,
                response,
            } => {
                let result = self.handle_rebuy(player_id, amount).await;
                let _ = response.send(result);
            }

            TableMessage::StartHand { response } => {
                let result = self.handle_start_hand().await;
                let _ = response.send(result);
            }

            TableMessage::AwardPot { winners, response } => {
                let result = self.handle_award(winners).await;
                let _ = response.send(result);
            }

            TableMessage::GetState { viewer, response } => {
                let _ = response.send(self.state.view_for(viewer));
            }

            TableMessage::GetSummary { response } => {
                let _ = response.send(self.summary());
            }

            TableMessage::TurnExpired { serial } => {
                self.handle_turn_expired(serial).await;
            }

            TableMessage::Close { response } => {
                self.is_closed = true;
                self.timer.cancel();
                let _ = response.send(TableResponse::Success);
            }
        }
    }

    /// Handle sit-down request: validate, move the buy-in into escrow, then
    /// persist the new seat.
    async fn handle_sit_down(
        &mut self,
        player_id: PlayerId,
        display_name: String,
        seat: SeatIndex,
        buy_in: Chips,
    ) -> TableResponse {
        let min_buy_in = self.config.min_buy_in_chips();
        let max_buy_in = self.config.max_buy_in_chips();
        if buy_in < min_buy_in || buy_in > max_buy_in {
            return TableResponse::error(format!(
                "Buy-in must be between {} and {} chips",
                min_buy_in, max_buy_in
            ));
        }

        let mut next = self.state.clone();
        if let Err(e) = sit_down(&mut next, player_id, display_name, seat, buy_in) {
            return e.into();
        }

        let transfer = Transfer::new(player_id, self.id, i64::from(buy_in), EntryType::BuyIn);
        if let Some(rejection) = self.ensure_balance(&transfer).await {
            return rejection;
        }
        if let Err(e) = self.wallet.debit(&transfer).await {
            return wallet_response(e);
        }

        if let Err(e) = self.commit(next, Vec::new()).await {
            self.reverse_debit(&transfer).await;
            return persistence_failed(&e);
        }

        log::info!(
            "Player {} sat down at table {} seat {} with {} chips",
            player_id,
            self.id,
            seat,
            buy_in
        );
        TableResponse::Success
    }

    /// Handle leave request
    async fn handle_leave(&mut self, player_id: PlayerId) -> TableResponse {
        let mut next = self.state.clone();
        let outcome = match leave_seat(&mut next, player_id) {
            Ok(outcome) => outcome,
            Err(e) => return e.into(),
        };

        match outcome {
            LeaveOutcome::Removed { seat, vacated } => {
                let cash_out = if vacated.stack > 0 {
                    let transfer = Transfer::new(
                        player_id,
                        self.id,
                        i64::from(vacated.stack),
                        EntryType::CashOut,
                    );
                    if let Err(e) = self.wallet.credit(&transfer).await {
                        return wallet_response(e);
                    }
                    Some(transfer)
                } else {
                    None
                };

                let record = seat_record(self.id, seat, &vacated, SeatRecordStatus::Left);
                if let Err(e) = self.commit(next, vec![record]).await {
                    if let Some(transfer) = cash_out {
                        self.reverse_credit(&transfer).await;
                    }
                    return persistence_failed(&e);
                }

                log::info!(
                    "Player {} left table {} with {} chips",
                    player_id,
                    self.id,
                    vacated.stack
                );
                TableResponse::Success
            }

            LeaveOutcome::Deferred { seat, progress } => {
                let restart = next.phase != self.state.phase;
                if let Err(e) = self.commit(next, Vec::new()).await {
                    return persistence_failed(&e);
                }

                log::info!(
                    "Player {} at table {} seat {} will leave after the hand",
                    player_id,
                    self.id,
                    seat
                );
                self.settle(&progress, restart).await;
                TableResponse::SuccessWithMessage {
                    message: "Seat will be released when the hand ends".to_string(),
                }
            }
        }
    }

    /// Handle player action
    async fn handle_action(&mut self, player_id: PlayerId, action: Action) -> TableResponse {
        let mut next = self.state.clone();
        let progress = match apply_action(&mut next, player_id, &action) {
            Ok(progress) => progress,
            Err(e) => return e.into(),
        };

        if let Err(e) = self.commit(next, Vec::new()).await {
            return persistence_failed(&e);
        }

        log::debug!("Table {}: player {} {}", self.id, player_id, action);
        self.settle(&progress, true).await;

        match progress {
            HandProgress::Finished { payouts } => TableResponse::SuccessWithMessage {
                message: payout_message(&payouts),
            },
            _ => TableResponse::Success,
        }
    }

    /// Handle rebuy request
    async fn handle_rebuy(&mut self, player_id: PlayerId, amount: Chips) -> TableResponse {
        if self.state.is_hand_in_progress() {
            return TableResponse::HandInProgress;
        }
        if amount == 0 {
            return TableResponse::error("Amount must be positive");
        }

        let Some(stack) = self
            .state
            .seat_of(player_id)
            .and_then(|idx| self.state.seat(idx))
            .map(|seat| seat.stack)
        else {
            return TableResponse::NotAtTable;
        };

        let max_stack = self.config.max_buy_in_chips();
        if stack.saturating_add(amount) > max_stack {
            return TableResponse::error(format!(
                "Rebuy would take the stack above {} chips",
                max_stack
            ));
        }

        let mut next = self.state.clone();
        let new_stack = match add_chips(&mut next, player_id, amount) {
            Ok(new_stack) => new_stack,
            Err(e) => return e.into(),
        };

        let transfer = Transfer::new(player_id, self.id, i64::from(amount), EntryType::Rebuy);
        if let Some(rejection) = self.ensure_balance(&transfer).await {
            return rejection;
        }
        if let Err(e) = self.wallet.debit(&transfer).await {
            return wallet_response(e);
        }

        if let Err(e) = self.commit(next, Vec::new()).await {
            self.reverse_debit(&transfer).await;
            return persistence_failed(&e);
        }

        log::info!(
            "Player {} rebought {} chips at table {} (stack {})",
            player_id,
            amount,
            self.id,
            new_stack
        );
        TableResponse::Success
    }

    async fn handle_start_hand(&mut self) -> TableResponse {
        let mut next = self.state.clone();
        let progress = match start_hand(&mut next, &self.blinds) {
            Ok(progress) => progress,
            Err(e) => return e.into(),
        };

        if let Err(e) = self.commit(next, Vec::new()).await {
            return persistence_failed(&e);
        }

        log::info!(
            "Table {}: hand #{} started",
            self.id,
            self.state.hand_number
        );
        self.settle(&progress, true).await;
        TableResponse::SuccessWithMessage {
            message: format!("Hand #{} started", self.state.hand_number),
        }
    }

    async fn handle_award(&mut self, winners: Vec<SeatIndex>) -> TableResponse {
        let mut next = self.state.clone();
        let payouts = match award_pot(&mut next, &winners) {
            Ok(payouts) => payouts,
            Err(e) => return e.into(),
        };

        if let Err(e) = self.commit(next, Vec::new()).await {
            return persistence_failed(&e);
        }

        let message = payout_message(&payouts);
        log::info!("Table {}: {}", self.id, message);
        self.settle(&HandProgress::Finished { payouts }, true).await;
        TableResponse::SuccessWithMessage { message }
    }

    /// Apply the default action for a player whose turn ran out.
    async fn handle_turn_expired(&mut self, serial: u64) {
        if !self.timer.is_current(serial) {
            log::debug!("Table {}: ignoring stale turn timer {}", self.id, serial);
            return;
        }

        let Some((player_id, action)) = default_action(&self.state) else {
            self.timer.cancel();
            return;
        };

        log::info!(
            "Table {}: player {} timed out and {}",
            self.id,
            player_id,
            action
        );
        let response = self.handle_action(player_id, action).await;
        if !response.is_success() {
            log::warn!(
                "Table {}: default action for player {} failed: {:?}",
                self.id,
                player_id,
                response.error_message()
            );
            self.timer.reset();
        }
    }

    /// Persist `next` as the following version; on success make it current
    /// and publish it. Seat records for every occupied seat are written with
    /// the snapshot, plus any `left` records passed in.
    async fn commit(
        &mut self,
        mut next: GameState,
        left: Vec<SeatRecord>,
    ) -> Result<(), StoreError> {
        let expected = self.state.version;
        next.version = expected + 1;

        let mut records: Vec<SeatRecord> = next
            .seats
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                let seat = slot.as_ref()?;
                Some(seat_record(self.id, idx, seat, SeatRecordStatus::Seated))
            })
            .collect();
        records.extend(left);

        match self
            .store
            .save_state(self.id, expected, &next, &records)
            .await
        {
            Ok(()) => {
                self.state = next;
                self.events.publish(
                    self.id,
                    TableEvent::GameUpdate {
                        table_id: self.id,
                        state: self.state.view_for(None),
                    },
                );
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "Table {}: failed to save version {}: {}",
                    self.id,
                    expected + 1,
                    e
                );
                if matches!(e, StoreError::StaleVersion { .. }) {
                    self.reload().await;
                }
                Err(e)
            }
        }
    }

    /// Adopt the stored snapshot after losing a version race.
    async fn reload(&mut self) {
        match self.store.load_state(self.id).await {
            Ok(Some(state)) => {
                log::warn!(
                    "Table {}: reloaded version {} from store",
                    self.id,
                    state.version
                );
                self.state = state;
                self.sync_timer(true);
            }
            Ok(None) => log::warn!("Table {}: no stored snapshot to reload", self.id),
            Err(e) => log::error!("Table {}: reload failed: {}", self.id, e),
        }
    }

    /// Follow-up after a committed change: restart the turn timer and, once
    /// a hand is over, release seats whose players asked to leave.
    async fn settle(&mut self, progress: &HandProgress, restart: bool) {
        self.sync_timer(restart);
        if let HandProgress::Finished { payouts } = progress {
            log::debug!(
                "Table {}: hand #{} finished, {} payouts",
                self.id,
                self.state.hand_number,
                payouts.len()
            );
            self.release_departed().await;
        }
    }

    fn sync_timer(&mut self, restart: bool) {
        match self.state.active_seat {
            None => self.timer.cancel(),
            Some(seat) => {
                if restart || self.timer.active_seat() != Some(seat) {
                    self.timer.start(seat);
                }
            }
        }
    }

    /// Clear seats flagged `leaving` and cash their stacks out. A seat whose
    /// cash-out fails stays flagged and is retried after the next hand.
    async fn release_departed(&mut self) {
        let mut next = self.state.clone();
        let departed = next.remove_departed();
        if departed.is_empty() {
            return;
        }

        let mut records = Vec::new();
        let mut cash_outs = Vec::new();
        for (idx, seat) in departed {
            if seat.stack > 0 {
                let transfer = Transfer::new(
                    seat.player_id,
                    self.id,
                    i64::from(seat.stack),
                    EntryType::CashOut,
                );
                if let Err(e) = self.wallet.credit(&transfer).await {
                    log::error!(
                        "Table {}: cash-out of {} chips for player {} failed: {}",
                        self.id,
                        seat.stack,
                        seat.player_id,
                        e
                    );
                    next.seats[idx] = Some(seat);
                    continue;
                }
                cash_outs.push(transfer);
            }
            records.push(seat_record(self.id, idx, &seat, SeatRecordStatus::Left));
        }

        if records.is_empty() {
            return;
        }
        if let Err(e) = self.commit(next, records).await {
            log::error!("Table {}: could not release departed seats: {}", self.id, e);
            for transfer in &cash_outs {
                self.reverse_credit(transfer).await;
            }
        }
    }

    /// Reject a wallet debit up front when the balance can't cover it.
    async fn ensure_balance(&self, transfer: &Transfer) -> Option<TableResponse> {
        match self.wallet.balance(transfer.player_id).await {
            Ok(balance) if balance < transfer.amount => Some(TableResponse::InsufficientChips {
                required: transfer.amount,
                available: balance,
            }),
            Ok(_) => None,
            Err(e) => Some(wallet_response(e)),
        }
    }

    async fn reverse_debit(&self, transfer: &Transfer) {
        match self.wallet.credit(&transfer.reversal()).await {
            Ok(_) => log::info!(
                "Table {}: returned {} chips to player {} after failed save",
                self.id,
                transfer.amount,
                transfer.player_id
            ),
            Err(e) => log::error!(
                "CRITICAL: Table {}: failed to return {} chips to player {}: {}. Chips may be stuck in escrow!",
                self.id,
                transfer.amount,
                transfer.player_id,
                e
            ),
        }
    }

    async fn reverse_credit(&self, transfer: &Transfer) {
        match self.wallet.debit(&transfer.reversal()).await {
            Ok(_) => log::info!(
                "Table {}: took back {} chips from player {} after failed save",
                self.id,
                transfer.amount,
                transfer.player_id
            ),
            Err(e) => log::error!(
                "CRITICAL: Table {}: failed to take back {} chips from player {}: {}",
                self.id,
                transfer.amount,
                transfer.player_id,
                e
            ),
        }
    }

    fn summary(&self) -> TableSummary {
        TableSummary {
            table_id: self.id,
            name: self.config.name.clone(),
            player_count: self.state.occupied_count(),
            max_players: self.config.max_players,
            blinds: self.blinds.blinds(),
            phase: self.state.phase,
            pot: self.state.pot,
            hand_number: self.state.hand_number,
            speed: self.config.speed,
        }
    }
}

fn seat_record(table_id: TableId, idx: SeatIndex, seat: &Seat, status: SeatRecordStatus) -> SeatRecord {
    SeatRecord {
        table_id,
        player_id: seat.player_id,
        seat_number: idx,
        stack: seat.stack,
        status,
        joined_at: seat.joined_at,
    }
}

fn wallet_response(err: WalletError) -> TableResponse {
    match err {
        WalletError::InsufficientBalance {
            available,
            required,
        } => TableResponse::InsufficientChips {
            required,
            available,
        },
        other => TableResponse::error(other.client_message()),
    }
}

fn persistence_failed(err: &StoreError) -> TableResponse {
    let reason = match err {
        StoreError::StaleVersion { .. } => "table changed, try again".to_string(),
        StoreError::Timeout(_) => "storage timed out".to_string(),
        _ => "storage unavailable".to_string(),
    };
    TableResponse::PersistenceFailed { reason }
}
