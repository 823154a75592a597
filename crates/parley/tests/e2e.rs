// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the context-memory pipeline.
//!
//! Each test builds an isolated TestHarness with a temp SQLite database and a
//! scripted provider. Tests are independent and order-insensitive.

use chrono::{Duration, Utc};
use parley_core::{
    EntityFilter, EntityType, KnowledgeProfile, KnowledgeStore, SummaryFilter,
};
use parley_memory::CompactionReason;
use parley_test_utils::TestHarness;
use parley_test_utils::fixtures::{PROFILE_RESPONSE, PROJECT_ALPHA_SUMMARY, make_conversation};

// ---- Summarization ----

#[tokio::test]
async fn project_alpha_conversation_is_summarized_with_entities() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![PROJECT_ALPHA_SUMMARY.to_string()])
        .build()
        .await
        .unwrap();

    assert!(harness.summarize("conv-alpha", 2).await);

    let summary = harness
        .store
        .get_summary_by_conversation("conv-alpha")
        .await
        .unwrap()
        .expect("summary row");
    assert!(summary.topics.iter().any(|t| t == "Project Alpha"));
    assert_eq!(summary.exchange_count, 2);
    assert_eq!(summary.duration_seconds, Some(180));

    let people = harness
        .store
        .list_entities(&EntityFilter {
            entity_type: Some(EntityType::Person),
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].name, "Sarah");
    assert_eq!(people[0].mention_count, 1);

    let mentions = harness
        .store
        .mentions_for_summary(&summary.id)
        .await
        .unwrap();
    assert!(mentions.iter().any(|m| m.entity_id == people[0].id));
}

#[tokio::test]
async fn second_summarization_of_same_conversation_is_a_no_op() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![
            PROJECT_ALPHA_SUMMARY.to_string(),
            PROJECT_ALPHA_SUMMARY.to_string(),
        ])
        .build()
        .await
        .unwrap();

    assert!(harness.summarize("conv-alpha", 2).await);
    assert!(!harness.summarize("conv-alpha", 3).await);

    assert_eq!(harness.mock_provider.call_count(), 1);
    let count = harness
        .store
        .count_summaries(&SummaryFilter::default())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn short_conversation_makes_no_provider_call() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![PROJECT_ALPHA_SUMMARY.to_string()])
        .build()
        .await
        .unwrap();

    let mut messages = make_conversation(2);
    messages.pop();
    assert!(!harness.memory.should_summarize(&messages));
    assert!(!harness.memory.summarize_conversation("conv-short", &messages).await);
    assert_eq!(harness.mock_provider.call_count(), 0);
}

#[tokio::test]
async fn malformed_summary_response_writes_nothing() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["not json".to_string()])
        .build()
        .await
        .unwrap();

    assert!(!harness.summarize("conv-bad", 2).await);
    assert_eq!(harness.mock_provider.call_count(), 1);

    let stats = harness.memory.stats().await.unwrap();
    assert_eq!(stats.summaries, 0);
    assert_eq!(stats.entities, 0);
    assert_eq!(stats.mentions, 0);
}

#[tokio::test]
async fn summarized_meeting_appears_in_injected_context() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![PROJECT_ALPHA_SUMMARY.to_string()])
        .build()
        .await
        .unwrap();

    assert!(harness.memory.get_context_for_injection().await.is_none());
    assert!(harness.summarize("conv-alpha", 2).await);

    let context = harness
        .memory
        .get_context_for_injection()
        .await
        .expect("context after summarization");
    assert!(context.starts_with("## Context About the User"));
    assert!(context.contains("Project Alpha launch timeline"));
    assert!(context.contains("Sarah"));
}

// ---- Compaction ----

#[tokio::test]
async fn sixty_uncompacted_summaries_trigger_compaction() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![PROFILE_RESPONSE.to_string()])
        .build()
        .await
        .unwrap();

    harness
        .seed_summaries(60, Utc::now() - Duration::hours(2))
        .await
        .unwrap();

    let before = harness.memory.build_context_string().await;
    assert!(!before.contains("Product manager driving"));

    let decision = harness.memory.should_compact().await;
    assert!(decision.should_run);
    assert_eq!(decision.reason, CompactionReason::ThresholdReached);

    let started = Utc::now();
    assert!(harness.memory.run_compaction_if_needed().await);

    let profile = harness.memory.profile().await.unwrap().expect("profile");
    assert_eq!(profile.source_count, 60);
    let last = profile.last_compacted.expect("last_compacted");
    assert!(last >= started - Duration::seconds(1));
    assert!(last <= Utc::now());

    let after = harness.memory.build_context_string().await;
    assert_ne!(before, after);
    assert!(after.contains("Product manager driving"));

    let decision = harness.memory.should_compact().await;
    assert!(!decision.should_run);
    assert_eq!(decision.uncompacted, 0);
}

#[tokio::test]
async fn compaction_runs_after_interval_with_one_new_summary() {
    let harness = TestHarness::builder().build().await.unwrap();
    let last = Utc::now() - Duration::days(31);
    harness
        .store
        .save_profile(&KnowledgeProfile {
            summary: Some("Earlier profile".into()),
            last_compacted: Some(last),
            source_count: 4,
            ..KnowledgeProfile::default()
        })
        .await
        .unwrap();
    harness
        .seed_summaries(1, last + Duration::days(1))
        .await
        .unwrap();

    let decision = harness.memory.should_compact().await;
    assert!(decision.should_run);
    assert_eq!(decision.reason, CompactionReason::IntervalElapsed);
    assert_eq!(decision.uncompacted, 1);
}

#[tokio::test]
async fn compaction_waits_when_recent_and_below_threshold() {
    let harness = TestHarness::builder().build().await.unwrap();
    let last = Utc::now() - Duration::days(1);
    harness
        .store
        .save_profile(&KnowledgeProfile {
            summary: Some("Recent profile".into()),
            last_compacted: Some(last),
            ..KnowledgeProfile::default()
        })
        .await
        .unwrap();
    harness
        .seed_summaries(10, last + Duration::minutes(5))
        .await
        .unwrap();

    let decision = harness.memory.should_compact().await;
    assert!(!decision.should_run);
    assert_eq!(decision.uncompacted, 10);
    assert!(!harness.memory.run_compaction_if_needed().await);
    assert_eq!(harness.mock_provider.call_count(), 0);
}

#[tokio::test]
async fn malformed_compaction_response_leaves_profile_untouched() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["not json".to_string()])
        .build()
        .await
        .unwrap();
    harness
        .seed_summaries(3, Utc::now() - Duration::hours(1))
        .await
        .unwrap();

    assert!(harness.memory.compact_knowledge().await.is_none());
    assert_eq!(harness.mock_provider.call_count(), 1);

    let stats = harness.memory.stats().await.unwrap();
    assert!(stats.last_compacted.is_none());
    assert_eq!(stats.source_count, 0);
}

#[tokio::test]
async fn pipeline_without_provider_is_inert() {
    let harness = TestHarness::builder()
        .without_provider()
        .build()
        .await
        .unwrap();
    harness
        .seed_summaries(60, Utc::now() - Duration::hours(1))
        .await
        .unwrap();

    assert!(!harness.summarize("conv-x", 3).await);
    assert!(!harness.memory.run_compaction_if_needed().await);
    assert_eq!(harness.mock_provider.call_count(), 0);

    // Stored summaries still feed the context block.
    assert!(harness.memory.get_context_for_injection().await.is_some());
}

// ---- Lifecycle ----

#[tokio::test]
async fn forgotten_conversation_can_be_summarized_again() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![
            PROJECT_ALPHA_SUMMARY.to_string(),
            PROJECT_ALPHA_SUMMARY.to_string(),
        ])
        .build()
        .await
        .unwrap();

    assert!(harness.summarize("conv-alpha", 2).await);
    assert!(harness.memory.forget_conversation("conv-alpha").await.unwrap());
    assert!(harness.summarize("conv-alpha", 2).await);

    let sarah = harness
        .store
        .list_entities(&EntityFilter {
            entity_type: Some(EntityType::Person),
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(sarah[0].mention_count, 2);
}

#[tokio::test]
async fn wipe_clears_context() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![PROJECT_ALPHA_SUMMARY.to_string()])
        .build()
        .await
        .unwrap();

    assert!(harness.summarize("conv-alpha", 2).await);
    assert!(harness.memory.get_context_for_injection().await.is_some());

    harness.memory.wipe().await.unwrap();
    assert!(harness.memory.get_context_for_injection().await.is_none());
    assert_eq!(harness.memory.stats().await.unwrap().summaries, 0);
}
