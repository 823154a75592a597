// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript files for `parley summarize`.
//!
//! A transcript is either a JSON array of messages or an object with a
//! `messages` array. Each message has `role`, `content`, and an optional
//! RFC 3339 `timestamp`.

use std::path::Path;

use parley_core::{ChatMessage, ParleyError};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Messages(Vec<ChatMessage>),
    Wrapped { messages: Vec<ChatMessage> },
}

/// Parse transcript JSON.
pub fn parse_transcript(raw: &str) -> Result<Vec<ChatMessage>, ParleyError> {
    let file: TranscriptFile = serde_json::from_str(raw)
        .map_err(|e| ParleyError::Config(format!("invalid transcript: {e}")))?;
    Ok(match file {
        TranscriptFile::Messages(messages) | TranscriptFile::Wrapped { messages } => messages,
    })
}

/// Read and parse a transcript file.
pub async fn load_transcript(path: &Path) -> Result<Vec<ChatMessage>, ParleyError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(ParleyError::storage)?;
    parse_transcript(&raw)
}
