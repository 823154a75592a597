// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for chat completions streaming responses.
//!
//! Converts a reqwest response byte stream into [`ProviderStreamChunk`]s using
//! the `eventsource-stream` crate for SSE protocol compliance.

use eventsource_stream::Eventsource;
use futures::stream::StreamExt;
use parley_core::{ChunkStream, ParleyError, ProviderStreamChunk, TokenUsage};

use crate::types::ChatCompletionChunk;

/// Sentinel sent as the data of the last SSE event.
const DONE_SENTINEL: &str = "[DONE]";

/// Map one SSE data payload to a chunk. `Ok(None)` means nothing to emit.
pub fn parse_chunk(data: &str) -> Result<Option<ProviderStreamChunk>, ParleyError> {
    let data = data.trim();
    if data.is_empty() || data == DONE_SENTINEL {
        return Ok(None);
    }

    let parsed: ChatCompletionChunk =
        serde_json::from_str(data).map_err(|e| ParleyError::Provider {
            message: format!("failed to parse completion chunk: {e}"),
            source: Some(Box::new(e)),
        })?;

    let (text, finish_reason) = match parsed.choices.into_iter().next() {
        Some(choice) => (
            choice.delta.content.unwrap_or_default(),
            choice.finish_reason,
        ),
        None => (String::new(), None),
    };
    let usage = parsed.usage.map(|u| TokenUsage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    if text.is_empty() && usage.is_none() && finish_reason.is_none() {
        return Ok(None);
    }
    Ok(Some(ProviderStreamChunk {
        text,
        usage,
        finish_reason,
    }))
}

/// Parses a reqwest streaming response into a stream of provider chunks.
///
/// Role-only deltas, keep-alives, and the `[DONE]` sentinel are skipped.
pub fn parse_sse_stream(response: reqwest::Response) -> ChunkStream {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => parse_chunk(&event.data).transpose(),
            Err(e) => Some(Err(ParleyError::Provider {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}
