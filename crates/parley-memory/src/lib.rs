// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Meeting memory for Parley.
//!
//! Finished conversations are summarized into the knowledge store, and the
//! accumulated summaries are periodically compacted into a single knowledge
//! profile. Both run one LLM call each and treat its output as untrusted JSON.
//!
//! - [`ConversationSummarizer`] - one summary per conversation, plus entities
//! - [`KnowledgeCompactor`] - threshold-gated merge of summaries into the profile
//! - [`MaintenanceQueue`] - single background worker for both
//! - [`ContextMemory`] - the whole pipeline behind one handle

pub mod background;
pub mod compactor;
pub mod contract;
pub mod llm;
pub mod service;
pub mod summarizer;

pub use background::{MaintenanceJob, MaintenanceQueue};
pub use compactor::{CompactionDecision, CompactionReason, KnowledgeCompactor};
pub use contract::{ContractError, ProfileUpdate, SummarizationResult};
pub use llm::{Completion, collect_completion};
pub use service::ContextMemory;
pub use summarizer::{ConversationSummarizer, exchange_count, should_summarize};
