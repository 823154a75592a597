// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`KnowledgeStore`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use parley_config::model::StorageConfig;
use parley_core::{
    AdapterType, EntityFilter, EntityMention, HealthStatus, KnowledgeEntity, KnowledgeProfile,
    KnowledgeStore, MeetingSummary, MemoryStats, NewEntity, NewMeetingSummary, ParleyError,
    PluginAdapter, SummaryEdit, SummaryFilter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed knowledge store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened on the first call to [`KnowledgeStore::initialize`]
/// unless one was supplied up front.
pub struct SqliteKnowledgeStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteKnowledgeStore {
    /// Create a store for the configured path. Nothing is opened yet.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database. `initialize` becomes a no-op.
    pub fn with_database(db: Database) -> Self {
        Self {
            config: StorageConfig {
                database_path: ":memory:".to_string(),
                wal_mode: false,
            },
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// A ready store over a fresh in-memory database.
    pub async fn in_memory() -> Result<Self, ParleyError> {
        Ok(Self::with_database(Database::open_in_memory().await?))
    }

    fn db(&self) -> Result<&Database, ParleyError> {
        self.db.get().ok_or_else(|| ParleyError::Storage {
            source: "knowledge store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteKnowledgeStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for SqliteKnowledgeStore {
    async fn initialize(&self) -> Result<(), ParleyError> {
        if self.db.initialized() {
            return Ok(());
        }
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ParleyError::Storage {
            source: "knowledge store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "knowledge store initialized");
        Ok(())
    }

    // --- Summaries ---

    async fn create_summary(
        &self,
        summary: &NewMeetingSummary,
    ) -> Result<Option<MeetingSummary>, ParleyError> {
        queries::summaries::create_summary(self.db()?, summary).await
    }

    async fn get_summary(&self, id: &str) -> Result<Option<MeetingSummary>, ParleyError> {
        queries::summaries::get_summary(self.db()?, id).await
    }

    async fn get_summary_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<MeetingSummary>, ParleyError> {
        queries::summaries::get_summary_by_conversation(self.db()?, conversation_id).await
    }

    async fn list_summaries(
        &self,
        filter: &SummaryFilter,
    ) -> Result<Vec<MeetingSummary>, ParleyError> {
        queries::summaries::list_summaries(self.db()?, filter).await
    }

    async fn count_summaries(&self, filter: &SummaryFilter) -> Result<u64, ParleyError> {
        queries::summaries::count_summaries(self.db()?, filter).await
    }

    async fn update_summary(
        &self,
        id: &str,
        edit: &SummaryEdit,
    ) -> Result<Option<MeetingSummary>, ParleyError> {
        queries::summaries::update_summary(self.db()?, id, edit).await
    }

    async fn delete_summary(&self, id: &str) -> Result<bool, ParleyError> {
        queries::summaries::delete_summary(self.db()?, id).await
    }

    async fn delete_summary_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<bool, ParleyError> {
        queries::summaries::delete_summary_for_conversation(self.db()?, conversation_id).await
    }

    // --- Entities ---

    async fn upsert_entity(
        &self,
        entity: &NewEntity,
        seen_at: DateTime<Utc>,
    ) -> Result<KnowledgeEntity, ParleyError> {
        queries::entities::upsert_entity(self.db()?, entity, seen_at).await
    }

    async fn link_mention(&self, entity_id: &str, summary_id: &str) -> Result<(), ParleyError> {
        queries::entities::link_mention(self.db()?, entity_id, summary_id).await
    }

    async fn list_entities(
        &self,
        filter: &EntityFilter,
    ) -> Result<Vec<KnowledgeEntity>, ParleyError> {
        queries::entities::list_entities(self.db()?, filter).await
    }

    async fn mentions_for_summary(
        &self,
        summary_id: &str,
    ) -> Result<Vec<EntityMention>, ParleyError> {
        queries::entities::mentions_for_summary(self.db()?, summary_id).await
    }

    async fn delete_entity(&self, id: &str) -> Result<bool, ParleyError> {
        queries::entities::delete_entity(self.db()?, id).await
    }

    // --- Profile ---

    async fn get_profile(&self) -> Result<Option<KnowledgeProfile>, ParleyError> {
        queries::profile::get_profile(self.db()?).await
    }

    async fn save_profile(&self, profile: &KnowledgeProfile) -> Result<(), ParleyError> {
        queries::profile::save_profile(self.db()?, profile).await
    }

    async fn clear_profile(&self) -> Result<(), ParleyError> {
        queries::profile::clear_profile(self.db()?).await
    }

    // --- Bulk ---

    async fn clear_all(&self) -> Result<(), ParleyError> {
        queries::profile::clear_all(self.db()?).await
    }

    async fn stats(&self) -> Result<MemoryStats, ParleyError> {
        queries::profile::stats(self.db()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn temp_config(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            database_path: dir.path().join("parley.db").to_string_lossy().into_owned(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let store = SqliteKnowledgeStore::new(temp_config(&dir));
        let err = store.get_profile().await.unwrap_err();
        assert!(err.to_string().contains("not initialized"));
        assert!(matches!(
            store.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn initialize_is_idempotent_and_healthy() {
        let dir = tempdir().unwrap();
        let store = SqliteKnowledgeStore::new(temp_config(&dir));
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        assert_eq!(store.adapter_type(), AdapterType::Storage);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = SqliteKnowledgeStore::new(temp_config(&dir));
            store.initialize().await.unwrap();
            store
                .create_summary(&NewMeetingSummary {
                    conversation_id: "conv-1".into(),
                    summary: "Kickoff".into(),
                    exchange_count: 3,
                    ..Default::default()
                })
                .await
                .unwrap();
            store.shutdown().await.unwrap();
        }

        let store = SqliteKnowledgeStore::new(temp_config(&dir));
        store.initialize().await.unwrap();
        let summary = store.get_summary_by_conversation("conv-1").await.unwrap().unwrap();
        assert_eq!(summary.summary, "Kickoff");
        assert_eq!(summary.exchange_count, 3);
    }

    #[tokio::test]
    async fn in_memory_store_is_ready() {
        let store = SqliteKnowledgeStore::in_memory().await.unwrap();
        store.initialize().await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats, MemoryStats::default());
    }
}
