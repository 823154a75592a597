// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with scripted responses,
//! streamed back in fixed-size chunks, and records every request it sees.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use parley_core::{
    AdapterType, ChunkStream, HealthStatus, ParleyError, PluginAdapter, ProviderAdapter,
    ProviderRequest, ProviderStreamChunk, TokenUsage,
};

const DEFAULT_RESPONSE: &str = "mock response";
const DEFAULT_CHUNK_SIZE: usize = 16;

#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Error(String),
}

/// A mock LLM provider that streams pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned.
pub struct MockProvider {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ProviderRequest>>,
    calls: AtomicUsize,
    chunk_size: usize,
}

impl MockProvider {
    /// Create a new mock provider with an empty response queue.
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Create a mock provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Scripted::Text).collect()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Stream responses in chunks of `size` characters.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Add a response to the end of the queue.
    pub async fn push_response(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .await
            .push_back(Scripted::Text(text.into()));
    }

    /// Make the next queued call fail with a provider error.
    pub async fn push_error(&self, message: impl Into<String>) {
        self.responses
            .lock()
            .await
            .push_back(Scripted::Error(message.into()));
    }

    /// Number of `stream` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, oldest first.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().await.last().cloned()
    }

    async fn next_response(&self) -> Scripted {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Scripted::Text(DEFAULT_RESPONSE.to_string()))
    }

    fn chunks(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
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
impl ProviderAdapter for MockProvider {
    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ParleyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let input_tokens = request
            .messages
            .iter()
            .map(|m| m.content.len())
            .sum::<usize>();
        self.requests.lock().await.push(request);

        let text = match self.next_response().await {
            Scripted::Text(text) => text,
            Scripted::Error(message) => return Err(ParleyError::provider(message)),
        };

        // Text deltas, then a final chunk with usage and the finish reason.
        let mut chunks: Vec<Result<ProviderStreamChunk, ParleyError>> = self
            .chunks(&text)
            .into_iter()
            .map(|c| Ok(ProviderStreamChunk::text(c)))
            .collect();
        chunks.push(Ok(ProviderStreamChunk {
            text: String::new(),
            usage: Some(TokenUsage {
                input_tokens: u32::try_from(input_tokens / 4).unwrap_or(u32::MAX),
                output_tokens: u32::try_from(text.len() / 4).unwrap_or(u32::MAX),
            }),
            finish_reason: Some("stop".to_string()),
        }));

        Ok(Box::pin(stream::iter(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use parley_core::ChatMessage;

    fn request(text: &str) -> ProviderRequest {
        ProviderRequest {
            model: None,
            system_prompt: None,
            messages: vec![ChatMessage::user(text)],
            max_tokens: 64,
            temperature: None,
        }
    }

    async fn collect(provider: &MockProvider, text: &str) -> Result<String, ParleyError> {
        let mut stream = provider.stream(request(text)).await?;
        let mut out = String::new();
        while let Some(chunk) = stream.next().await {
            out.push_str(&chunk?.text);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn responses_are_returned_in_order_then_default() {
        let provider = MockProvider::with_responses(vec!["first".into(), "second".into()]);
        assert_eq!(collect(&provider, "a").await.unwrap(), "first");
        assert_eq!(collect(&provider, "b").await.unwrap(), "second");
        assert_eq!(collect(&provider, "c").await.unwrap(), "mock response");
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn chunks_preserve_multibyte_text() {
        let provider =
            MockProvider::with_responses(vec!["héllo wörld ✓".into()]).with_chunk_size(3);
        let mut stream = provider.stream(request("x")).await.unwrap();
        let mut deltas = 0;
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if !chunk.text.is_empty() {
                deltas += 1;
            }
            text.push_str(&chunk.text);
        }
        assert_eq!(text, "héllo wörld ✓");
        assert_eq!(deltas, 5);
    }

    #[tokio::test]
    async fn scripted_error_fails_the_call() {
        let provider = MockProvider::new();
        provider.push_error("boom").await;
        provider.push_response("after").await;
        assert!(collect(&provider, "a").await.is_err());
        assert_eq!(collect(&provider, "b").await.unwrap(), "after");
        assert_eq!(
            provider.last_request().await.unwrap().messages[0].content,
            "b"
        );
    }
}
