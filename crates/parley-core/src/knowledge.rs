// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge domain types: meeting summaries, extracted entities, and the
//! singleton knowledge profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Kind of a named thing extracted from a conversation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Project,
    Term,
    Company,
}

/// A persisted summary of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub id: String,
    /// At most one summary exists per conversation.
    pub conversation_id: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub goals: Vec<String>,
    pub action_items: Vec<String>,
    pub next_steps: Vec<String>,
    pub decisions: Vec<String>,
    pub team_updates: Vec<String>,
    pub participants: Vec<String>,
    pub exchange_count: u32,
    pub duration_seconds: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a [`MeetingSummary`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMeetingSummary {
    pub conversation_id: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub goals: Vec<String>,
    pub action_items: Vec<String>,
    pub next_steps: Vec<String>,
    pub decisions: Vec<String>,
    pub team_updates: Vec<String>,
    pub participants: Vec<String>,
    pub exchange_count: u32,
    pub duration_seconds: Option<u64>,
    /// Creation time; the store uses the current time when unset.
    pub created_at: Option<DateTime<Utc>>,
}

/// A manual edit of an existing summary. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryEdit {
    pub summary: Option<String>,
    pub topics: Option<Vec<String>>,
    pub goals: Option<Vec<String>>,
    pub action_items: Option<Vec<String>>,
    pub next_steps: Option<Vec<String>>,
    pub decisions: Option<Vec<String>>,
    pub team_updates: Option<Vec<String>>,
    pub participants: Option<Vec<String>>,
}

/// Result ordering for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Filter for listing or counting summaries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryFilter {
    /// Inclusive lower bound on `created_at`.
    pub created_since: Option<DateTime<Utc>>,
    /// Exclusive lower bound on `created_at`.
    pub created_after: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub order: SortOrder,
}

/// A deduplicated named thing mentioned across summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntity {
    pub id: String,
    pub entity_type: EntityType,
    pub name: String,
    pub description: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub mention_count: u32,
}

/// An entity as extracted from one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntity {
    pub entity_type: EntityType,
    pub name: String,
    pub description: Option<String>,
}

/// Filter for listing entities, which are always ordered by mention count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityFilter {
    pub entity_type: Option<EntityType>,
    pub limit: Option<u32>,
}

/// Junction row linking an entity to a summary that mentions it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub entity_id: String,
    pub summary_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPerson {
    pub name: String,
    pub role: String,
    pub relationship: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyProject {
    pub name: String,
    pub status: String,
    pub description: String,
}

impl KeyProject {
    /// Whether the project status marks it as finished.
    pub fn is_completed(&self) -> bool {
        matches!(
            self.status.trim().to_ascii_lowercase().as_str(),
            "completed" | "complete" | "done"
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub term: String,
    pub meaning: String,
}

/// The singleton profile distilled from many summaries by compaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeProfile {
    pub summary: Option<String>,
    pub key_people: Vec<KeyPerson>,
    pub key_projects: Vec<KeyProject>,
    pub terminology: Vec<Term>,
    pub recent_goals: Vec<String>,
    pub recent_decisions: Vec<String>,
    pub recent_team_updates: Vec<String>,
    pub last_compacted: Option<DateTime<Utc>>,
    /// Cumulative number of summaries folded into the profile.
    pub source_count: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row counts across the knowledge store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub summaries: u64,
    pub entities: u64,
    pub mentions: u64,
    pub last_compacted: Option<DateTime<Utc>>,
    pub source_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn entity_type_parses_case_insensitively() {
        assert_eq!(EntityType::from_str("Person").unwrap(), EntityType::Person);
        assert_eq!(EntityType::from_str("COMPANY").unwrap(), EntityType::Company);
        assert!(EntityType::from_str("place").is_err());
    }

    #[test]
    fn entity_type_displays_lowercase() {
        assert_eq!(EntityType::Project.to_string(), "project");
        assert_eq!(EntityType::Term.as_ref(), "term");
    }

    #[test]
    fn project_completion_status() {
        let mut project = KeyProject {
            name: "Alpha".into(),
            status: "Completed".into(),
            description: String::new(),
        };
        assert!(project.is_completed());
        project.status = "active".into();
        assert!(!project.is_completed());
    }

    #[test]
    fn default_profile_is_empty() {
        let profile = KnowledgeProfile::default();
        assert!(profile.summary.is_none());
        assert!(profile.last_compacted.is_none());
        assert_eq!(profile.source_count, 0);
    }
}
