// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full context-memory stack with a mock
//! provider, in-memory settings, and a temp SQLite database.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parley_config::ParleyConfig;
use parley_config::model::StorageConfig;
use parley_config::settings::InMemorySettings;
use parley_core::{KnowledgeStore, ParleyError, ProviderAdapter};
use parley_memory::ContextMemory;
use parley_storage::SqliteKnowledgeStore;

use crate::fixtures::{make_conversation, new_summary};
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    config: ParleyConfig,
    with_provider: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            config: ParleyConfig::default(),
            with_provider: true,
        }
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Start from a custom configuration. Storage settings are replaced.
    pub fn with_config(mut self, config: ParleyConfig) -> Self {
        self.config = config;
        self
    }

    /// Wire the pipeline without any provider.
    pub fn without_provider(mut self) -> Self {
        self.with_provider = false;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, ParleyError> {
        let temp_dir = tempfile::TempDir::new().map_err(ParleyError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let store = SqliteKnowledgeStore::new(config.storage.clone());
        store.initialize().await?;
        let store: Arc<dyn KnowledgeStore> = Arc::new(store);

        let mock_provider = Arc::new(MockProvider::with_responses(self.responses));
        let provider = self
            .with_provider
            .then(|| mock_provider.clone() as Arc<dyn ProviderAdapter>);

        let settings = Arc::new(InMemorySettings::new());
        let memory = Arc::new(ContextMemory::new(
            store.clone(),
            settings.clone(),
            provider,
            &config,
        ));

        Ok(TestHarness {
            mock_provider,
            store,
            settings,
            memory,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock provider and temp storage.
pub struct TestHarness {
    /// The mock LLM provider. Present even when built without a provider.
    pub mock_provider: Arc<MockProvider>,
    /// SQLite knowledge store (temp DB, cleaned up on drop).
    pub store: Arc<dyn KnowledgeStore>,
    /// Runtime settings backing the assembler.
    pub settings: Arc<InMemorySettings>,
    /// The wired pipeline.
    pub memory: Arc<ContextMemory>,
    pub config: ParleyConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Summarize a generated conversation with `exchanges` exchanges.
    pub async fn summarize(&self, conversation_id: &str, exchanges: usize) -> bool {
        self.memory
            .summarize_conversation(conversation_id, &make_conversation(exchanges))
            .await
    }

    /// Insert `count` summaries directly, one second apart from `start`.
    pub async fn seed_summaries(
        &self,
        count: usize,
        start: DateTime<Utc>,
    ) -> Result<(), ParleyError> {
        for i in 0..count {
            let at = start + Duration::seconds(i as i64);
            self.store
                .create_summary(&new_summary(&format!("seeded-{i}"), at))
                .await?;
        }
        Ok(())
    }
}
