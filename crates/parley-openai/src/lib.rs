// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible provider adapter for Parley.
//!
//! This crate implements [`ProviderAdapter`] for any server speaking the
//! chat completions protocol (OpenAI, OpenRouter, Ollama, vLLM, and others),
//! streaming responses over SSE.

pub mod client;
pub mod sse;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use parley_config::model::ProviderConfig;
use parley_core::{
    AdapterType, ChunkStream, HealthStatus, ParleyError, PluginAdapter, ProviderAdapter,
    ProviderRequest,
};
use tracing::debug;

use crate::client::OpenAiClient;
use crate::types::{ApiMessage, ChatCompletionRequest, StreamOptions};

/// Chat completions provider implementing [`ProviderAdapter`].
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: OpenAiClient,
}

impl OpenAiProvider {
    /// Creates a provider from configuration.
    ///
    /// A missing API key is allowed; local servers usually do not need one.
    pub fn new(config: &ProviderConfig) -> Result<Self, ParleyError> {
        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            debug!(base_url = %config.base_url, "no API key configured for provider");
        }
        let client = OpenAiClient::new(
            &config.base_url,
            api_key.as_deref(),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self { client })
    }

    fn to_chat_request(&self, request: &ProviderRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ApiMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.extend(request.messages.iter().map(|m| ApiMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        }));

        ChatCompletionRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.client.default_model().to_string()),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    fn default_model(&self) -> &str {
        self.client.default_model()
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ParleyError> {
        let chat_request = self.to_chat_request(&request);
        debug!(
            model = %chat_request.model,
            messages = chat_request.messages.len(),
            "sending chat completion request"
        );
        self.client.stream_chat(&chat_request).await
    }
}
