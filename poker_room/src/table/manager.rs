//! Table manager for spawning and managing multiple table actors.

use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};

use super::{
    actor::{TableActor, TableHandle},
    config::{ConfigError, TableConfig},
    events::{EventPublisher, TableEvent},
    messages::TableSummary,
};
use crate::db::repository::{StoreError, TableStore, WalletStore};
use crate::game::state::GameState;
use crate::wallet::TableId;

/// Table lookup and lifecycle errors
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Table {0} not found")]
    NotFound(TableId),

    #[error("Table {0} is closed")]
    Closed(TableId),

    #[error("Table {0} already exists")]
    Duplicate(TableId),

    #[error("Invalid table configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to restore table: {0}")]
    Store(#[from] StoreError),

    #[error("Stored table has {stored} seats but the config asks for {configured}")]
    SeatCountMismatch { stored: usize, configured: usize },
}

/// Table manager for managing multiple table instances
pub struct TableManager {
    store: Arc<dyn TableStore>,

    wallet: Arc<dyn WalletStore>,

    events: Arc<dyn EventPublisher>,

    /// Active table handles
    tables: RwLock<HashMap<TableId, TableHandle>>,
}

impl TableManager {
    pub fn new(
        store: Arc<dyn TableStore>,
        wallet: Arc<dyn WalletStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            wallet,
            events,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Create and spawn a table actor.
    ///
    /// If the store holds a snapshot for `table_id` the table resumes from
    /// it; otherwise it starts empty with `config.max_players` seats.
    ///
    /// # Errors
    ///
    /// * `TableError::InvalidConfig` - Configuration failed validation
    /// * `TableError::Duplicate` - A table with this ID is already running
    /// * `TableError::Store` - The stored snapshot could not be read
    /// * `TableError::SeatCountMismatch` - The stored snapshot has a
    ///   different number of seats than `config.max_players`
    pub async fn create_table(
        &self,
        table_id: TableId,
        config: TableConfig,
    ) -> Result<TableHandle, TableError> {
        config.validate()?;

        let mut tables = self.tables.write().await;
        if tables.contains_key(&table_id) {
            return Err(TableError::Duplicate(table_id));
        }

        let state = match self.store.load_state(table_id).await? {
            Some(state) if state.seats.len() != config.max_players => {
                log::error!(
                    "Refusing to restore table {}: {} stored seats, {} configured",
                    table_id,
                    state.seats.len(),
                    config.max_players
                );
                return Err(TableError::SeatCountMismatch {
                    stored: state.seats.len(),
                    configured: config.max_players,
                });
            }
            Some(state) => {
                log::info!(
                    "Restoring table {} at version {} (hand #{})",
                    table_id,
                    state.version,
                    state.hand_number
                );
                state
            }
            None => GameState::new(config.max_players),
        };

        let (actor, handle) = TableActor::new(
            table_id,
            config,
            state,
            self.store.clone(),
            self.wallet.clone(),
            self.events.clone(),
        );
        tables.insert(table_id, handle.clone());
        drop(tables);

        tokio::spawn(actor.run());

        log::info!("Created and spawned table {}", table_id);
        Ok(handle)
    }

    /// Get a table handle
    pub async fn get_table(&self, table_id: TableId) -> Result<TableHandle, TableError> {
        self.tables
            .read()
            .await
            .get(&table_id)
            .cloned()
            .ok_or(TableError::NotFound(table_id))
    }

    /// Summaries of every running table, ordered by ID.
    pub async fn list_tables(&self) -> Vec<TableSummary> {
        let handles: Vec<TableHandle> = self.tables.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.summary().await {
                Ok(summary) => summaries.push(summary),
                Err(e) => log::warn!("Skipping table {}: {}", handle.table_id(), e),
            }
        }
        summaries.sort_by_key(|s| s.table_id);
        summaries
    }

    /// Subscribe to a running table's `game_update` events.
    pub async fn subscribe(
        &self,
        table_id: TableId,
    ) -> Result<broadcast::Receiver<TableEvent>, TableError> {
        self.get_table(table_id).await?;
        Ok(self.events.subscribe(table_id))
    }

    /// Stop a table's actor and forget its handle. The stored snapshot is
    /// kept, so the table can be created again later.
    pub async fn close_table(&self, table_id: TableId) -> Result<(), TableError> {
        let handle = self
            .tables
            .write()
            .await
            .remove(&table_id)
            .ok_or(TableError::NotFound(table_id))?;

        // The actor may already have stopped; the handle is gone either way
        if let Err(e) = handle.close().await {
            log::debug!("Table {} was already stopped: {}", table_id, e);
        }

        log::info!("Closed table {}", table_id);
        Ok(())
    }

    /// Get active table count
    pub async fn active_table_count(&self) -> usize {
        self.tables.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryTableStore, MemoryWallet};
    use crate::table::events::EventBus;

    fn manager() -> (TableManager, Arc<MemoryTableStore>) {
        let store = Arc::new(MemoryTableStore::new());
        let manager = TableManager::new(
            store.clone(),
            Arc::new(MemoryWallet::new()),
            Arc::new(EventBus::new()),
        );
        (manager, store)
    }

    #[tokio::test]
    async fn test_create_list_and_close() {
        let (manager, _) = manager();
        manager.create_table(2, TableConfig::default()).await.unwrap();
        manager
            .create_table(
                1,
                TableConfig {
                    name: "High Stakes".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let tables = manager.list_tables().await;
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].table_id, 1);
        assert_eq!(tables[0].name, "High Stakes");
        assert_eq!(tables[1].player_count, 0);

        manager.close_table(1).await.unwrap();
        assert_eq!(manager.active_table_count().await, 1);
        assert!(matches!(
            manager.get_table(1).await,
            Err(TableError::NotFound(1))
        ));
    }

    #[tokio::test]
    async fn test_rejects_duplicates_and_bad_config() {
        let (manager, _) = manager();
        manager.create_table(1, TableConfig::default()).await.unwrap();
        assert!(matches!(
            manager.create_table(1, TableConfig::default()).await,
            Err(TableError::Duplicate(1))
        ));

        let bad = TableConfig {
            max_players: 30,
            ..Default::default()
        };
        assert!(matches!(
            manager.create_table(2, bad).await,
            Err(TableError::InvalidConfig(ConfigError::SeatCount))
        ));
    }

    #[tokio::test]
    async fn test_restores_stored_snapshot() {
        let (manager, store) = manager();
        let mut state = GameState::new(6);
        state.hand_number = 12;
        state.version = 3;
        store.save_state(5, 0, &state, &[]).await.unwrap();

        let config = TableConfig {
            max_players: 6,
            ..Default::default()
        };
        let handle = manager.create_table(5, config).await.unwrap();
        let restored = handle.state(None).await.unwrap();
        assert_eq!(restored.hand_number, 12);
        assert_eq!(restored.version, 3);
        assert_eq!(restored.seats.len(), 6);
    }

    #[tokio::test]
    async fn test_rejects_snapshot_with_other_seat_count() {
        let (manager, store) = manager();
        store.save_state(5, 0, &GameState::new(6), &[]).await.unwrap();

        assert!(matches!(
            manager.create_table(5, TableConfig::default()).await,
            Err(TableError::SeatCountMismatch {
                stored: 6,
                configured: 9
            })
        ));
        assert!(matches!(
            manager.get_table(5).await,
            Err(TableError::NotFound(5))
        ));
    }
}
