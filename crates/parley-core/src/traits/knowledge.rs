// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence contract for summaries, entities, and the knowledge profile.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ParleyError;
use crate::knowledge::{
    EntityFilter, EntityMention, KnowledgeEntity, KnowledgeProfile, MeetingSummary, MemoryStats,
    NewEntity, NewMeetingSummary, SummaryEdit, SummaryFilter,
};
use crate::traits::adapter::PluginAdapter;

/// Async CRUD over the knowledge store.
///
/// Every call may fail. Callers in the memory pipeline log failures and
/// degrade to a no-op instead of propagating them.
#[async_trait]
pub trait KnowledgeStore: PluginAdapter {
    /// Prepare the backing store (open, migrate). Must be called once before use.
    async fn initialize(&self) -> Result<(), ParleyError>;

    // --- Summaries ---

    /// Insert a summary. Returns `None` when the conversation already has one.
    async fn create_summary(
        &self,
        summary: &NewMeetingSummary,
    ) -> Result<Option<MeetingSummary>, ParleyError>;

    async fn get_summary(&self, id: &str) -> Result<Option<MeetingSummary>, ParleyError>;

    async fn get_summary_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<MeetingSummary>, ParleyError>;

    async fn list_summaries(
        &self,
        filter: &SummaryFilter,
    ) -> Result<Vec<MeetingSummary>, ParleyError>;

    /// Count summaries matching the filter, ignoring its limit and order.
    async fn count_summaries(&self, filter: &SummaryFilter) -> Result<u64, ParleyError>;

    /// Apply a manual edit. Returns the updated summary, or `None` if absent.
    async fn update_summary(
        &self,
        id: &str,
        edit: &SummaryEdit,
    ) -> Result<Option<MeetingSummary>, ParleyError>;

    /// Delete a summary and its mention links. Returns whether a row was removed.
    async fn delete_summary(&self, id: &str) -> Result<bool, ParleyError>;

    async fn delete_summary_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<bool, ParleyError>;

    // --- Entities ---

    /// Insert an entity or bump its mention count, keyed by exact (type, name).
    async fn upsert_entity(
        &self,
        entity: &NewEntity,
        seen_at: DateTime<Utc>,
    ) -> Result<KnowledgeEntity, ParleyError>;

    /// Link an entity to a summary. Linking the same pair twice is a no-op.
    async fn link_mention(&self, entity_id: &str, summary_id: &str) -> Result<(), ParleyError>;

    /// List entities ordered by mention count, most mentioned first.
    async fn list_entities(
        &self,
        filter: &EntityFilter,
    ) -> Result<Vec<KnowledgeEntity>, ParleyError>;

    async fn mentions_for_summary(
        &self,
        summary_id: &str,
    ) -> Result<Vec<EntityMention>, ParleyError>;

    async fn delete_entity(&self, id: &str) -> Result<bool, ParleyError>;

    // --- Profile ---

    /// Read the singleton profile, `None` before the first save.
    async fn get_profile(&self) -> Result<Option<KnowledgeProfile>, ParleyError>;

    /// Create or overwrite the singleton profile.
    async fn save_profile(&self, profile: &KnowledgeProfile) -> Result<(), ParleyError>;

    /// Reset every profile field to empty. The row itself is kept.
    async fn clear_profile(&self) -> Result<(), ParleyError>;

    // --- Bulk ---

    /// Remove all summaries, entities, and mentions and reset the profile.
    async fn clear_all(&self) -> Result<(), ParleyError>;

    async fn stats(&self) -> Result<MemoryStats, ParleyError>;
}
