// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Column encoding shared by the query modules.
//!
//! Timestamps are stored as fixed-width RFC 3339 text with millisecond
//! precision so that string comparison orders them correctly. List fields
//! are stored as JSON arrays.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parley_core::{EntityType, KnowledgeEntity, MeetingSummary};
use rusqlite::Row;
use rusqlite::types::Type;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Column list matching [`summary_from_row`].
pub const SUMMARY_COLUMNS: &str = "id, conversation_id, summary, topics, goals, action_items, \
     next_steps, decisions, team_updates, participants, exchange_count, duration_seconds, \
     created_at, updated_at";

/// Column list matching [`entity_from_row`].
pub const ENTITY_COLUMNS: &str =
    "id, entity_type, name, description, first_seen, last_seen, mention_count";

/// Drop sub-millisecond precision so values survive a store round trip.
pub fn to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

pub fn get_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| parse_ts(idx, &r)).transpose()
}

pub fn to_json<T: Serialize>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

pub fn get_json<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<MeetingSummary> {
    let duration: Option<i64> = row.get(11)?;
    Ok(MeetingSummary {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        summary: row.get(2)?,
        topics: get_json(row, 3)?,
        goals: get_json(row, 4)?,
        action_items: get_json(row, 5)?,
        next_steps: get_json(row, 6)?,
        decisions: get_json(row, 7)?,
        team_updates: get_json(row, 8)?,
        participants: get_json(row, 9)?,
        exchange_count: row.get(10)?,
        duration_seconds: duration.map(|d| d.max(0) as u64),
        created_at: get_ts(row, 12)?,
        updated_at: get_ts(row, 13)?,
    })
}

pub fn entity_from_row(row: &Row<'_>) -> rusqlite::Result<KnowledgeEntity> {
    let raw_type: String = row.get(1)?;
    let entity_type = raw_type
        .parse::<EntityType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    Ok(KnowledgeEntity {
        id: row.get(0)?,
        entity_type,
        name: row.get(2)?,
        description: row.get(3)?,
        first_seen: get_ts(row, 4)?,
        last_seen: get_ts(row, 5)?,
        mention_count: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_fixed_width_and_sortable() {
        let early = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::milliseconds(7);
        let a = format_ts(early);
        let b = format_ts(late);
        assert_eq!(a, "2026-01-02T03:04:05.000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_ts(0, &b).unwrap(), late);
    }

    #[test]
    fn bad_timestamp_is_a_conversion_error() {
        assert!(matches!(
            parse_ts(3, "yesterday"),
            Err(rusqlite::Error::FromSqlConversionFailure(3, Type::Text, _))
        ));
    }
}
