// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of the JSON the model returns for summaries and profiles.
//!
//! Model output is untrusted. Fields with the wrong shape fall back to empty
//! values and list elements of the wrong shape are dropped. A response is only
//! rejected when it is not a JSON object or carries no summary text.

use parley_core::{EntityType, KeyPerson, KeyProject, NewEntity, Term};
use serde_json::{Map, Value};
use thiserror::Error;

/// Cap on `key_people` in a compacted profile.
pub const MAX_KEY_PEOPLE: usize = 10;
/// Cap on `key_projects` in a compacted profile.
pub const MAX_KEY_PROJECTS: usize = 8;
/// Cap on `terminology` in a compacted profile.
pub const MAX_TERMS: usize = 10;
/// Cap on each of the `recent_*` lists in a compacted profile.
pub const MAX_RECENT_ITEMS: usize = 10;

/// Why a model response was rejected.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("model returned an empty response")]
    Empty,

    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected a JSON object at the top level")]
    NotAnObject,

    #[error("response has no summary text")]
    EmptySummary,
}

/// Structured output of one summarization call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummarizationResult {
    pub summary: String,
    pub topics: Vec<String>,
    pub goals: Vec<String>,
    pub action_items: Vec<String>,
    pub next_steps: Vec<String>,
    pub decisions: Vec<String>,
    pub team_updates: Vec<String>,
    pub participants: Vec<String>,
    pub entities: Vec<NewEntity>,
}

/// Structured output of one compaction call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub summary: String,
    pub key_people: Vec<KeyPerson>,
    pub key_projects: Vec<KeyProject>,
    pub terminology: Vec<Term>,
    pub recent_goals: Vec<String>,
    pub recent_decisions: Vec<String>,
    pub recent_team_updates: Vec<String>,
}

/// Parse a summarization response.
pub fn parse_summary_response(response: &str) -> Result<SummarizationResult, ContractError> {
    let obj = parse_object(response)?;
    let summary = string_field(&obj, "summary");
    if summary.is_empty() {
        return Err(ContractError::EmptySummary);
    }

    Ok(SummarizationResult {
        summary,
        topics: string_list(&obj, "topics", usize::MAX),
        goals: string_list(&obj, "goals", usize::MAX),
        action_items: string_list(&obj, "action_items", usize::MAX),
        next_steps: string_list(&obj, "next_steps", usize::MAX),
        decisions: string_list(&obj, "decisions", usize::MAX),
        team_updates: string_list(&obj, "team_updates", usize::MAX),
        participants: string_list(&obj, "participants", usize::MAX),
        entities: dedup_entities(record_list(&obj, "entities", usize::MAX, entity_from)),
    })
}

/// Parse a compaction response, applying the per-list caps.
pub fn parse_profile_response(response: &str) -> Result<ProfileUpdate, ContractError> {
    let obj = parse_object(response)?;
    let summary = string_field(&obj, "summary");
    if summary.is_empty() {
        return Err(ContractError::EmptySummary);
    }

    Ok(ProfileUpdate {
        summary,
        key_people: record_list(&obj, "key_people", MAX_KEY_PEOPLE, person_from),
        key_projects: record_list(&obj, "key_projects", MAX_KEY_PROJECTS, project_from),
        terminology: record_list(&obj, "terminology", MAX_TERMS, term_from),
        recent_goals: string_list(&obj, "recent_goals", MAX_RECENT_ITEMS),
        recent_decisions: string_list(&obj, "recent_decisions", MAX_RECENT_ITEMS),
        recent_team_updates: string_list(&obj, "recent_team_updates", MAX_RECENT_ITEMS),
    })
}

/// Remove a surrounding triple-backtick fence, with or without a language tag.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_object(response: &str) -> Result<Map<String, Value>, ContractError> {
    let body = strip_code_fence(response);
    if body.is_empty() {
        return Err(ContractError::Empty);
    }

    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        // Models sometimes wrap the object in prose. Retry on the outermost braces.
        Err(e) => match (body.find('{'), body.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<Value>(&body[start..=end])?
            }
            _ => return Err(ContractError::InvalidJson(e)),
        },
    };

    match value {
        Value::Object(obj) => Ok(obj),
        _ => Err(ContractError::NotAnObject),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn string_list(obj: &Map<String, Value>, key: &str, cap: usize) -> Vec<String> {
    let Some(items) = obj.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .take(cap)
        .collect()
}

fn record_list<T>(
    obj: &Map<String, Value>,
    key: &str,
    cap: usize,
    build: fn(&Map<String, Value>) -> Option<T>,
) -> Vec<T> {
    let Some(items) = obj.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(build)
        .take(cap)
        .collect()
}

fn required(obj: &Map<String, Value>, key: &str) -> Option<String> {
    let value = string_field(obj, key);
    (!value.is_empty()).then_some(value)
}

/// One entry per `(type, name)`, in first-seen order. A later description
/// fills in a missing one.
fn dedup_entities(entities: Vec<NewEntity>) -> Vec<NewEntity> {
    let mut unique: Vec<NewEntity> = Vec::with_capacity(entities.len());
    for entity in entities {
        match unique
            .iter_mut()
            .find(|e| e.entity_type == entity.entity_type && e.name == entity.name)
        {
            Some(existing) => {
                if existing.description.is_none() {
                    existing.description = entity.description;
                }
            }
            None => unique.push(entity),
        }
    }
    unique
}

fn entity_from(obj: &Map<String, Value>) -> Option<NewEntity> {
    let entity_type = string_field(obj, "type").parse::<EntityType>().ok()?;
    let name = required(obj, "name")?;
    Some(NewEntity {
        entity_type,
        name,
        description: required(obj, "description"),
    })
}

fn person_from(obj: &Map<String, Value>) -> Option<KeyPerson> {
    Some(KeyPerson {
        name: required(obj, "name")?,
        role: string_field(obj, "role"),
        relationship: string_field(obj, "relationship"),
    })
}

fn project_from(obj: &Map<String, Value>) -> Option<KeyProject> {
    Some(KeyProject {
        name: required(obj, "name")?,
        status: string_field(obj, "status"),
        description: string_field(obj, "description"),
    })
}

fn term_from(obj: &Map<String, Value>) -> Option<Term> {
    Some(Term {
        term: required(obj, "term")?,
        meaning: string_field(obj, "meaning"),
    })
}
