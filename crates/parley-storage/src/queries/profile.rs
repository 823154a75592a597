// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Singleton knowledge profile and whole-store operations.

use chrono::Utc;
use parley_core::{KnowledgeProfile, MemoryStats, ParleyError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{format_ts, get_json, get_opt_ts, to_json, to_millis};

const PROFILE_ID: &str = "profile";

/// Read the profile row, `None` before it has ever been saved.
pub async fn get_profile(db: &Database) -> Result<Option<KnowledgeProfile>, ParleyError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT summary, key_people, key_projects, terminology, recent_goals,
                        recent_decisions, recent_team_updates, last_compacted, source_count,
                        updated_at
                 FROM knowledge_profile WHERE id = ?1",
                params![PROFILE_ID],
                |row| {
                    Ok(KnowledgeProfile {
                        summary: row.get(0)?,
                        key_people: get_json(row, 1)?,
                        key_projects: get_json(row, 2)?,
                        terminology: get_json(row, 3)?,
                        recent_goals: get_json(row, 4)?,
                        recent_decisions: get_json(row, 5)?,
                        recent_team_updates: get_json(row, 6)?,
                        last_compacted: get_opt_ts(row, 7)?,
                        source_count: row.get(8)?,
                        updated_at: get_opt_ts(row, 9)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Create or overwrite the profile. List fields are replaced, never merged.
pub async fn save_profile(db: &Database, profile: &KnowledgeProfile) -> Result<(), ParleyError> {
    let profile = profile.clone();
    let now = format_ts(to_millis(Utc::now()));
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO knowledge_profile (id, summary, key_people, key_projects,
                     terminology, recent_goals, recent_decisions, recent_team_updates,
                     last_compacted, source_count, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                     summary = excluded.summary,
                     key_people = excluded.key_people,
                     key_projects = excluded.key_projects,
                     terminology = excluded.terminology,
                     recent_goals = excluded.recent_goals,
                     recent_decisions = excluded.recent_decisions,
                     recent_team_updates = excluded.recent_team_updates,
                     last_compacted = excluded.last_compacted,
                     source_count = excluded.source_count,
                     updated_at = excluded.updated_at",
                params![
                    PROFILE_ID,
                    profile.summary,
                    to_json(&profile.key_people)?,
                    to_json(&profile.key_projects)?,
                    to_json(&profile.terminology)?,
                    to_json(&profile.recent_goals)?,
                    to_json(&profile.recent_decisions)?,
                    to_json(&profile.recent_team_updates)?,
                    profile.last_compacted.map(format_ts),
                    profile.source_count,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

const RESET_PROFILE_SQL: &str = "UPDATE knowledge_profile SET
         summary = NULL, key_people = '[]', key_projects = '[]', terminology = '[]',
         recent_goals = '[]', recent_decisions = '[]', recent_team_updates = '[]',
         last_compacted = NULL, source_count = 0, updated_at = ?1
     WHERE id = 'profile'";

/// Reset every profile field. The row is kept if it exists.
pub async fn clear_profile(db: &Database) -> Result<(), ParleyError> {
    let now = format_ts(to_millis(Utc::now()));
    db.connection()
        .call(move |conn| {
            conn.execute(RESET_PROFILE_SQL, params![now])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Remove all summaries, entities, and mentions, and reset the profile.
pub async fn clear_all(db: &Database) -> Result<(), ParleyError> {
    let now = format_ts(to_millis(Utc::now()));
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM entity_mentions", [])?;
            tx.execute("DELETE FROM knowledge_entities", [])?;
            tx.execute("DELETE FROM meeting_summaries", [])?;
            tx.execute(RESET_PROFILE_SQL, params![now])?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Row counts plus the compaction bookkeeping from the profile.
pub async fn stats(db: &Database) -> Result<MemoryStats, ParleyError> {
    db.connection()
        .call(|conn| {
            let count = |table: &str| -> rusqlite::Result<u64> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|n| n.max(0) as u64)
            };
            let summaries = count("meeting_summaries")?;
            let entities = count("knowledge_entities")?;
            let mentions = count("entity_mentions")?;
            let profile = conn
                .query_row(
                    "SELECT last_compacted, source_count FROM knowledge_profile WHERE id = ?1",
                    params![PROFILE_ID],
                    |row| Ok((get_opt_ts(row, 0)?, row.get::<_, u32>(1)?)),
                )
                .optional()?;
            let (last_compacted, source_count) = profile.unwrap_or((None, 0));
            Ok(MemoryStats {
                summaries,
                entities,
                mentions,
                last_compacted,
                source_count,
            })
        })
        .await
        .map_err(map_tr_err)
}
