// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collect a streamed provider response into a single string.
//!
//! The memory pipeline never parses partial output, so every call drains the
//! whole stream before handing the text to the contract parser.

use chrono::Utc;
use futures::StreamExt;
use parley_context::estimate_tokens;
use parley_core::{
    EventBus, FeatureType, ParleyError, ProviderAdapter, ProviderRequest, TokenUsage, UsageEvent,
};
use tokio_util::sync::CancellationToken;

/// The concatenated text of a streamed response.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

/// Drain `provider.stream(request)` into one [`Completion`].
///
/// When `cancel` fires mid-stream the partial text is discarded and a
/// [`ParleyError::Internal`] is returned.
pub async fn collect_completion(
    provider: &dyn ProviderAdapter,
    request: ProviderRequest,
    cancel: Option<&CancellationToken>,
) -> Result<Completion, ParleyError> {
    let model = request
        .model
        .clone()
        .unwrap_or_else(|| provider.default_model().to_string());
    let mut stream = provider.stream(request).await?;
    let mut completion = Completion {
        model,
        ..Completion::default()
    };

    loop {
        let next = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Err(ParleyError::Internal("completion cancelled".into()));
                }
                chunk = stream.next() => chunk,
            },
            None => stream.next().await,
        };

        let Some(chunk) = next else { break };
        let chunk = chunk?;
        completion.text.push_str(&chunk.text);
        if chunk.usage.is_some() {
            completion.usage = chunk.usage;
        }
        if chunk.finish_reason.is_some() {
            completion.finish_reason = chunk.finish_reason;
        }
    }

    Ok(completion)
}

/// Publish token usage for one completed call.
pub(crate) fn publish_usage(
    events: &EventBus,
    feature: FeatureType,
    prompt: &ProviderRequest,
    completion: &Completion,
    conversation_id: Option<&str>,
) {
    let estimated_input_tokens = prompt
        .messages
        .iter()
        .map(|m| estimate_tokens(&m.content))
        .sum::<usize>()
        + prompt.system_prompt.as_deref().map_or(0, estimate_tokens);

    events.publish(UsageEvent {
        feature,
        model: completion.model.clone(),
        usage: completion.usage,
        estimated_input_tokens,
        estimated_output_tokens: estimate_tokens(&completion.text),
        conversation_id: conversation_id.map(str::to_string),
        timestamp: Utc::now(),
    });
}
