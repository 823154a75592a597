// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation summarization.
//!
//! A finished conversation is turned into one persisted meeting summary plus
//! linked entities, using exactly one LLM call. Every failure is logged and
//! reported as "nothing produced"; nothing is ever partially written.

use std::sync::Arc;

use parley_config::model::SummarizerConfig;
use parley_context::ContextAssembler;
use parley_core::{
    ChatMessage, EventBus, FeatureType, KnowledgeStore, NewMeetingSummary, ProviderAdapter,
    ProviderRequest, Role,
};
use tracing::{debug, info, warn};

use crate::contract::{SummarizationResult, parse_summary_response};
use crate::llm::{collect_completion, publish_usage};

/// System prompt for conversation summarization.
const SUMMARY_PROMPT: &str = r#"You summarize meeting and chat transcripts for an assistant's long-term memory.

Return ONLY a raw JSON object. Do not wrap it in markdown code fences and do not write anything before or after it.

Fields:
- "summary": 2-4 sentences on what the conversation covered and what came out of it
- "topics": array of short topic strings
- "goals": array of goals the user or team stated
- "action_items": array of concrete follow-up tasks, with owners when known
- "next_steps": array of planned next steps
- "decisions": array of decisions that were made
- "team_updates": array of status updates shared by team members
- "participants": array of participant names
- "entities": array of {"type", "name", "description"} objects, where "type" is one of "person", "project", "term", "company"

Use an empty array for any field with nothing to report."#;

const SUMMARY_TEMPERATURE: f32 = 0.2;

/// Number of complete user/assistant exchanges in a conversation.
pub fn exchange_count(messages: &[ChatMessage]) -> u32 {
    let (users, assistants) = messages
        .iter()
        .fold((0u32, 0u32), |(users, assistants), m| match m.role {
            Role::User => (users + 1, assistants),
            Role::Assistant => (users, assistants + 1),
            Role::System => (users, assistants),
        });
    users.min(assistants)
}

/// Whether a conversation has enough exchanges to be worth summarizing.
pub fn should_summarize(messages: &[ChatMessage], min_exchanges: u32) -> bool {
    exchange_count(messages) >= min_exchanges
}

/// Seconds between the earliest and latest timestamped message.
pub fn conversation_duration(messages: &[ChatMessage]) -> Option<u64> {
    let mut stamps = messages.iter().filter_map(|m| m.timestamp);
    let first = stamps.next()?;
    let (earliest, latest) = stamps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
    u64::try_from((latest - earliest).num_seconds()).ok()
}

fn render_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turns finished conversations into meeting summaries.
pub struct ConversationSummarizer {
    store: Arc<dyn KnowledgeStore>,
    assembler: Arc<ContextAssembler>,
    provider: Option<Arc<dyn ProviderAdapter>>,
    events: EventBus,
    config: SummarizerConfig,
}

impl ConversationSummarizer {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        assembler: Arc<ContextAssembler>,
        provider: Option<Arc<dyn ProviderAdapter>>,
        events: EventBus,
        config: SummarizerConfig,
    ) -> Self {
        Self {
            store,
            assembler,
            provider,
            events,
            config,
        }
    }

    pub fn should_summarize(&self, messages: &[ChatMessage]) -> bool {
        should_summarize(messages, self.config.min_exchanges)
    }

    /// Ask the model for a summary of one conversation.
    ///
    /// Returns `None` without calling the model when the conversation is too
    /// short, is already summarized, or no provider is available. Returns
    /// `None` after the call when the response cannot be parsed.
    pub async fn generate_conversation_summary(
        &self,
        conversation_id: &str,
        messages: &[ChatMessage],
        provider: Option<&dyn ProviderAdapter>,
    ) -> Option<SummarizationResult> {
        if !self.should_summarize(messages) {
            debug!(
                conversation_id,
                exchanges = exchange_count(messages),
                "too few exchanges to summarize"
            );
            return None;
        }

        match self.store.get_summary_by_conversation(conversation_id).await {
            Ok(Some(_)) => {
                debug!(conversation_id, "conversation already summarized");
                return None;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(conversation_id, error = %e, "could not check for an existing summary");
                return None;
            }
        }

        let Some(provider) = provider.or(self.provider.as_deref()) else {
            debug!(conversation_id, "no provider configured, skipping summarization");
            return None;
        };

        let request = ProviderRequest {
            model: None,
            system_prompt: Some(SUMMARY_PROMPT.to_string()),
            messages: vec![ChatMessage::user(render_transcript(messages))],
            max_tokens: self.config.max_tokens,
            temperature: Some(SUMMARY_TEMPERATURE),
        };

        let completion = match collect_completion(provider, request.clone(), None).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(conversation_id, error = %e, "summarization call failed");
                return None;
            }
        };
        publish_usage(
            &self.events,
            FeatureType::Summarization,
            &request,
            &completion,
            Some(conversation_id),
        );

        match parse_summary_response(&completion.text) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(conversation_id, error = %e, "failed to parse summarization response");
                debug!("raw response: {}", completion.text);
                None
            }
        }
    }

    /// Persist a summary and its entities. Returns the new summary id.
    ///
    /// Entity failures are logged and skipped; the summary itself stays.
    pub async fn save_summarization_result(
        &self,
        conversation_id: &str,
        result: &SummarizationResult,
        exchange_count: u32,
        duration_seconds: Option<u64>,
    ) -> Option<String> {
        let new_summary = NewMeetingSummary {
            conversation_id: conversation_id.to_string(),
            summary: result.summary.clone(),
            topics: result.topics.clone(),
            goals: result.goals.clone(),
            action_items: result.action_items.clone(),
            next_steps: result.next_steps.clone(),
            decisions: result.decisions.clone(),
            team_updates: result.team_updates.clone(),
            participants: result.participants.clone(),
            exchange_count,
            duration_seconds,
            created_at: None,
        };

        let saved = match self.store.create_summary(&new_summary).await {
            Ok(Some(saved)) => saved,
            Ok(None) => {
                info!(conversation_id, "summary already written by another run");
                return None;
            }
            Err(e) => {
                warn!(conversation_id, error = %e, "failed to save summary");
                return None;
            }
        };

        let mut linked = 0usize;
        for (i, entity) in result.entities.iter().enumerate() {
            let repeated = result.entities[..i]
                .iter()
                .any(|e| e.entity_type == entity.entity_type && e.name == entity.name);
            if repeated {
                continue;
            }
            let stored = match self.store.upsert_entity(entity, saved.created_at).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(name = %entity.name, error = %e, "failed to upsert entity");
                    continue;
                }
            };
            match self.store.link_mention(&stored.id, &saved.id).await {
                Ok(()) => linked += 1,
                Err(e) => warn!(name = %entity.name, error = %e, "failed to link entity mention"),
            }
        }

        self.assembler.invalidate_cache();
        info!(
            conversation_id,
            summary_id = %saved.id,
            entities = linked,
            "conversation summarized"
        );
        Some(saved.id)
    }

    /// Generate and save a summary. Returns whether one was produced.
    ///
    /// Safe to call on every conversation switch; it is a no-op when the
    /// conversation is short or already summarized.
    pub async fn summarize_conversation(
        &self,
        conversation_id: &str,
        messages: &[ChatMessage],
        provider: Option<&dyn ProviderAdapter>,
    ) -> bool {
        let Some(result) = self
            .generate_conversation_summary(conversation_id, messages, provider)
            .await
        else {
            return false;
        };

        self.save_summarization_result(
            conversation_id,
            &result,
            exchange_count(messages),
            conversation_duration(messages),
        )
        .await
        .is_some()
    }
}
