// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage events published for every LLM call made by the memory pipeline.
//!
//! Cost tracking lives outside this workspace; it subscribes to the
//! [`EventBus`] and prices each [`UsageEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::broadcast;

use crate::types::TokenUsage;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 256;

/// The pipeline feature that triggered an LLM call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum FeatureType {
    /// Conversation summarization.
    Summarization,
    /// Knowledge profile compaction.
    Compaction,
}

/// One LLM call made by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub feature: FeatureType,
    pub model: String,
    /// Provider-reported usage, when the stream carried it.
    pub usage: Option<TokenUsage>,
    /// Heuristic estimate of prompt tokens.
    pub estimated_input_tokens: usize,
    /// Heuristic estimate of completion tokens.
    pub estimated_output_tokens: usize,
    pub conversation_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Broadcast bus for [`UsageEvent`]s.
///
/// Publishing never blocks. Slow receivers lag rather than stall the sender.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UsageEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Returns the number of receivers, 0 when nobody listens.
    pub fn publish(&self, event: UsageEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UsageEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(feature: FeatureType) -> UsageEvent {
        UsageEvent {
            feature,
            model: "test-model".into(),
            usage: None,
            estimated_input_tokens: 10,
            estimated_output_tokens: 5,
            conversation_id: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(make_event(FeatureType::Compaction)), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(make_event(FeatureType::Summarization));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.feature, FeatureType::Summarization);
        assert_eq!(event.model, "test-model");
    }
}
