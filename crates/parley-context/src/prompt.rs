// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt building: the context block goes in front of the system prompt.

use std::sync::Arc;

use parley_config::model::AgentConfig;
use parley_core::{ChatMessage, ProviderRequest};

use crate::assembler::ContextAssembler;

/// Assembles provider requests with the user context prepended to the
/// system prompt.
pub struct ContextEngine {
    assembler: Arc<ContextAssembler>,
    system_prompt: String,
}

impl ContextEngine {
    /// Uses `agent.system_prompt`, or a default naming the assistant.
    pub fn new(assembler: Arc<ContextAssembler>, agent: &AgentConfig) -> Self {
        let system_prompt = agent
            .system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "You are {}, an assistant that helps with meetings and conversations.",
                    agent.name
                )
            });
        Self {
            assembler,
            system_prompt,
        }
    }

    pub fn assembler(&self) -> &Arc<ContextAssembler> {
        &self.assembler
    }

    pub fn base_system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The system prompt with the context block in front, when there is one.
    pub async fn system_prompt(&self) -> String {
        match self.assembler.get_context_for_injection().await {
            Some(context) => format!("{context}\n\n{}", self.system_prompt),
            None => self.system_prompt.clone(),
        }
    }

    /// Build a request from prior history and the new user message.
    pub async fn build_request(
        &self,
        history: &[ChatMessage],
        user_message: &str,
        max_tokens: u32,
    ) -> ProviderRequest {
        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(user_message));
        ProviderRequest {
            model: None,
            system_prompt: Some(self.system_prompt().await),
            messages,
            max_tokens,
            temperature: None,
        }
    }
}
