// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The context-memory pipeline behind one handle.
//!
//! [`ContextMemory`] owns the assembler, summarizer, and compactor over a
//! shared knowledge store. Every write that changes what the context block
//! would contain also drops the assembler's cache.

use std::sync::Arc;

use parley_config::ParleyConfig;
use parley_config::settings::{ContextMemorySettings, ContextMemorySettingsUpdate, SettingsStore};
use parley_context::{ContextAssembler, ContextEngine};
use parley_core::{
    ChatMessage, EntityFilter, EventBus, KnowledgeEntity, KnowledgeProfile, KnowledgeStore,
    MeetingSummary, MemoryStats, ParleyError, ProviderAdapter, SummaryEdit, SummaryFilter,
};
use tracing::info;

use crate::compactor::{CompactionDecision, KnowledgeCompactor};
use crate::summarizer::ConversationSummarizer;

pub struct ContextMemory {
    store: Arc<dyn KnowledgeStore>,
    assembler: Arc<ContextAssembler>,
    engine: ContextEngine,
    summarizer: ConversationSummarizer,
    compactor: KnowledgeCompactor,
    provider: Option<Arc<dyn ProviderAdapter>>,
    events: EventBus,
}

impl ContextMemory {
    /// Wire the pipeline. `store` must already be initialized.
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        settings: Arc<dyn SettingsStore>,
        provider: Option<Arc<dyn ProviderAdapter>>,
        config: &ParleyConfig,
    ) -> Self {
        let events = EventBus::new();
        let assembler = Arc::new(ContextAssembler::new(
            store.clone(),
            settings,
            config.context_memory.clone(),
        ));
        let engine = ContextEngine::new(assembler.clone(), &config.agent);
        let summarizer = ConversationSummarizer::new(
            store.clone(),
            assembler.clone(),
            provider.clone(),
            events.clone(),
            config.summarizer.clone(),
        );
        let compactor = KnowledgeCompactor::new(
            store.clone(),
            assembler.clone(),
            provider.clone(),
            events.clone(),
            config.compaction.clone(),
        );

        Self {
            store,
            assembler,
            engine,
            summarizer,
            compactor,
            provider,
            events,
        }
    }

    pub fn store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    pub fn assembler(&self) -> &Arc<ContextAssembler> {
        &self.assembler
    }

    pub fn engine(&self) -> &ContextEngine {
        &self.engine
    }

    pub fn summarizer(&self) -> &ConversationSummarizer {
        &self.summarizer
    }

    pub fn compactor(&self) -> &KnowledgeCompactor {
        &self.compactor
    }

    /// Usage events from summarization and compaction calls.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    // --- Context ---

    pub async fn build_context_string(&self) -> String {
        self.assembler.build_context_string().await
    }

    pub async fn get_context_for_injection(&self) -> Option<String> {
        self.assembler.get_context_for_injection().await
    }

    pub fn invalidate_context_cache(&self) {
        self.assembler.invalidate_cache();
    }

    pub fn get_settings(&self) -> ContextMemorySettings {
        self.assembler.get_settings()
    }

    pub fn set_settings(&self, update: &ContextMemorySettingsUpdate) -> Result<(), ParleyError> {
        self.assembler.set_settings(update)
    }

    // --- Maintenance ---

    pub fn should_summarize(&self, messages: &[ChatMessage]) -> bool {
        self.summarizer.should_summarize(messages)
    }

    pub async fn summarize_conversation(
        &self,
        conversation_id: &str,
        messages: &[ChatMessage],
    ) -> bool {
        self.summarizer
            .summarize_conversation(conversation_id, messages, None)
            .await
    }

    pub async fn should_compact(&self) -> CompactionDecision {
        self.compactor.should_compact().await
    }

    pub async fn compact_knowledge(&self) -> Option<KnowledgeProfile> {
        self.compactor.compact_knowledge(None).await
    }

    pub async fn run_compaction_if_needed(&self) -> bool {
        self.compactor.run_compaction_if_needed(None).await
    }

    // --- Inspection and manual edits ---

    pub async fn stats(&self) -> Result<MemoryStats, ParleyError> {
        self.store.stats().await
    }

    pub async fn recent_summaries(&self, limit: u32) -> Result<Vec<MeetingSummary>, ParleyError> {
        self.store
            .list_summaries(&SummaryFilter {
                limit: Some(limit),
                ..SummaryFilter::default()
            })
            .await
    }

    pub async fn top_entities(&self, limit: u32) -> Result<Vec<KnowledgeEntity>, ParleyError> {
        self.store
            .list_entities(&EntityFilter {
                entity_type: None,
                limit: Some(limit),
            })
            .await
    }

    pub async fn profile(&self) -> Result<Option<KnowledgeProfile>, ParleyError> {
        self.store.get_profile().await
    }

    /// Apply a manual edit to a stored summary.
    pub async fn update_summary(
        &self,
        id: &str,
        edit: &SummaryEdit,
    ) -> Result<Option<MeetingSummary>, ParleyError> {
        let updated = self.store.update_summary(id, edit).await?;
        if updated.is_some() {
            self.assembler.invalidate_cache();
        }
        Ok(updated)
    }

    /// Drop the summary of one conversation so it can be summarized again.
    pub async fn forget_conversation(&self, conversation_id: &str) -> Result<bool, ParleyError> {
        let removed = self
            .store
            .delete_summary_for_conversation(conversation_id)
            .await?;
        if removed {
            self.assembler.invalidate_cache();
            info!(conversation_id, "conversation summary removed");
        }
        Ok(removed)
    }

    pub async fn clear_profile(&self) -> Result<(), ParleyError> {
        self.store.clear_profile().await?;
        self.assembler.invalidate_cache();
        Ok(())
    }

    /// Remove every summary, entity, and mention and reset the profile.
    pub async fn wipe(&self) -> Result<(), ParleyError> {
        self.store.clear_all().await?;
        self.assembler.invalidate_cache();
        info!("context memory wiped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_config::settings::InMemorySettings;
    use parley_storage::SqliteKnowledgeStore;
    use parley_test_utils::MockProvider;
    use parley_test_utils::fixtures::{PROJECT_ALPHA_SUMMARY, make_conversation};

    async fn memory(responses: Vec<String>) -> ContextMemory {
        let store: Arc<dyn KnowledgeStore> =
            Arc::new(SqliteKnowledgeStore::in_memory().await.unwrap());
        let provider: Arc<dyn ProviderAdapter> = Arc::new(MockProvider::with_responses(responses));
        ContextMemory::new(
            store,
            Arc::new(InMemorySettings::new()),
            Some(provider),
            &ParleyConfig::default(),
        )
    }

    #[tokio::test]
    async fn summarized_conversation_shows_up_in_context() {
        let memory = memory(vec![PROJECT_ALPHA_SUMMARY.into()]).await;
        assert!(memory.get_context_for_injection().await.is_none());

        assert!(
            memory
                .summarize_conversation("conv-1", &make_conversation(2))
                .await
        );

        let context = memory.get_context_for_injection().await.unwrap();
        assert!(context.contains("### Recent Meetings"));
        assert!(context.contains("Sarah"));

        let prompt = memory.engine().system_prompt().await;
        assert!(prompt.starts_with("## Context About the User"));
    }

    #[tokio::test]
    async fn forget_conversation_allows_resummarizing() {
        let memory = memory(vec![
            PROJECT_ALPHA_SUMMARY.into(),
            PROJECT_ALPHA_SUMMARY.into(),
        ])
        .await;
        let messages = make_conversation(2);
        assert!(memory.summarize_conversation("conv-1", &messages).await);
        memory.build_context_string().await;

        assert!(memory.forget_conversation("conv-1").await.unwrap());
        assert!(!memory.assembler().is_cached());
        assert!(!memory.forget_conversation("conv-1").await.unwrap());

        assert!(memory.summarize_conversation("conv-1", &messages).await);
        assert_eq!(memory.stats().await.unwrap().summaries, 1);
    }

    #[tokio::test]
    async fn manual_edit_invalidates_cache() {
        let memory = memory(vec![PROJECT_ALPHA_SUMMARY.into()]).await;
        memory
            .summarize_conversation("conv-1", &make_conversation(2))
            .await;
        let id = memory.recent_summaries(1).await.unwrap()[0].id.clone();
        memory.build_context_string().await;

        let edited = memory
            .update_summary(
                &id,
                &SummaryEdit {
                    summary: Some("Corrected summary".into()),
                    ..SummaryEdit::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.summary, "Corrected summary");
        assert!(!memory.assembler().is_cached());
        assert!(memory.build_context_string().await.contains("Corrected summary"));

        let missing = memory
            .update_summary("no-such-id", &SummaryEdit::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn wipe_empties_everything() {
        let memory = memory(vec![PROJECT_ALPHA_SUMMARY.into()]).await;
        memory
            .summarize_conversation("conv-1", &make_conversation(2))
            .await;
        assert!(memory.stats().await.unwrap().entities > 0);

        memory.wipe().await.unwrap();
        let stats = memory.stats().await.unwrap();
        assert_eq!(stats.summaries, 0);
        assert_eq!(stats.entities, 0);
        assert_eq!(stats.mentions, 0);
        assert!(memory.build_context_string().await.is_empty());
    }

    #[tokio::test]
    async fn disabling_context_suppresses_injection() {
        let memory = memory(vec![PROJECT_ALPHA_SUMMARY.into()]).await;
        memory
            .summarize_conversation("conv-1", &make_conversation(2))
            .await;

        memory
            .set_settings(&ContextMemorySettingsUpdate {
                enabled: Some(false),
                ..ContextMemorySettingsUpdate::default()
            })
            .unwrap();
        assert!(!memory.get_settings().enabled);
        assert!(memory.get_context_for_injection().await.is_none());
    }
}
