// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Parley.
//!
//! Provides the error type, the knowledge domain types, and the adapter
//! traits that the storage, provider, and memory crates build on.

pub mod error;
pub mod events;
pub mod knowledge;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParleyError;
pub use events::{EventBus, FeatureType, UsageEvent};
pub use knowledge::{
    EntityFilter, EntityMention, EntityType, KeyPerson, KeyProject, KnowledgeEntity,
    KnowledgeProfile, MeetingSummary, MemoryStats, NewEntity, NewMeetingSummary, SortOrder,
    SummaryEdit, SummaryFilter, Term,
};
pub use traits::{ChunkStream, KnowledgeStore, PluginAdapter, ProviderAdapter};
pub use types::{
    AdapterType, ChatMessage, HealthStatus, ProviderRequest, ProviderStreamChunk, Role,
    TokenUsage,
};
