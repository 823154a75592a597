// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned conversations, summaries, and model responses.

use chrono::{DateTime, Duration, TimeZone, Utc};
use parley_core::{ChatMessage, NewMeetingSummary};

/// A well-formed summarization response: two entities, Sarah and Project Alpha.
pub const PROJECT_ALPHA_SUMMARY: &str = r#"{
  "summary": "Discussed the Project Alpha launch timeline with Sarah and agreed to move the launch to Q3.",
  "topics": ["Project Alpha", "launch timeline"],
  "goals": ["Launch Project Alpha in Q3"],
  "action_items": ["Sarah drafts the revised launch plan"],
  "next_steps": ["Review the plan next Tuesday"],
  "decisions": ["Launch moves to Q3"],
  "team_updates": ["Design review is complete"],
  "participants": ["Sarah"],
  "entities": [
    {"type": "person", "name": "Sarah", "description": "Product lead for Project Alpha"},
    {"type": "project", "name": "Project Alpha", "description": "Q3 product launch"}
  ]
}"#;

/// A well-formed compaction response.
pub const PROFILE_RESPONSE: &str = r#"```json
{
  "summary": "Product manager driving the Project Alpha launch.",
  "key_people": [
    {"name": "Sarah", "role": "Product lead", "relationship": "close collaborator"}
  ],
  "key_projects": [
    {"name": "Project Alpha", "status": "active", "description": "Q3 product launch"}
  ],
  "terminology": [
    {"term": "GA", "meaning": "General availability"}
  ],
  "recent_goals": ["Launch Project Alpha in Q3"],
  "recent_decisions": ["Launch moves to Q3"],
  "recent_team_updates": ["Design review is complete"]
}
```"#;

/// Fixed start time for generated conversations.
pub fn conversation_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A conversation of `exchanges` user/assistant pairs, one minute apart.
pub fn make_conversation(exchanges: usize) -> Vec<ChatMessage> {
    let start = conversation_start();
    (0..exchanges)
        .flat_map(|i| {
            let at = start + Duration::minutes(2 * i as i64);
            [
                ChatMessage::user(format!("Question {i} about Project Alpha")).at(at),
                ChatMessage::assistant(format!("Answer {i} mentioning Sarah"))
                    .at(at + Duration::minutes(1)),
            ]
        })
        .collect()
}

/// A stored-summary input with an explicit creation time.
pub fn new_summary(conversation_id: &str, created_at: DateTime<Utc>) -> NewMeetingSummary {
    NewMeetingSummary {
        conversation_id: conversation_id.to_string(),
        summary: format!("Summary of {conversation_id}"),
        topics: vec!["planning".to_string()],
        decisions: vec![format!("Decision from {conversation_id}")],
        participants: vec!["Sarah".to_string()],
        exchange_count: 2,
        created_at: Some(created_at),
        ..NewMeetingSummary::default()
    }
}
