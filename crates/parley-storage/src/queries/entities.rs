// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge entity and mention operations.

use chrono::{DateTime, Duration, Utc};
use parley_core::{EntityFilter, EntityMention, KnowledgeEntity, NewEntity, ParleyError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{ENTITY_COLUMNS, entity_from_row, format_ts, get_ts, to_millis};

/// Insert an entity or record another mention of it.
///
/// Matching is exact on `(entity_type, name)`. A repeat mention increments
/// `mention_count`, moves `last_seen` strictly forward, and replaces the
/// description when a non-empty one is given.
pub async fn upsert_entity(
    db: &Database,
    entity: &NewEntity,
    seen_at: DateTime<Utc>,
) -> Result<KnowledgeEntity, ParleyError> {
    let entity = entity.clone();
    let seen_at = to_millis(seen_at);
    let description = entity
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let entity_type = entity.entity_type.to_string();
            let existing = tx
                .query_row(
                    "SELECT id, last_seen FROM knowledge_entities
                     WHERE entity_type = ?1 AND name = ?2",
                    params![entity_type, entity.name],
                    |row| Ok((row.get::<_, String>(0)?, get_ts(row, 1)?)),
                )
                .optional()?;

            let id = match existing {
                Some((id, last_seen)) => {
                    let next_seen = seen_at.max(last_seen + Duration::milliseconds(1));
                    tx.execute(
                        "UPDATE knowledge_entities
                         SET mention_count = mention_count + 1,
                             last_seen = ?1,
                             description = COALESCE(?2, description)
                         WHERE id = ?3",
                        params![format_ts(next_seen), description, id],
                    )?;
                    id
                }
                None => {
                    let id = uuid::Uuid::new_v4().to_string();
                    tx.execute(
                        "INSERT INTO knowledge_entities
                             (id, entity_type, name, description, first_seen, last_seen, mention_count)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?5, 1)",
                        params![id, entity_type, entity.name, description, format_ts(seen_at)],
                    )?;
                    id
                }
            };

            let stored = tx.query_row(
                &format!("SELECT {ENTITY_COLUMNS} FROM knowledge_entities WHERE id = ?1"),
                params![id],
                entity_from_row,
            )?;
            tx.commit()?;
            Ok(stored)
        })
        .await
        .map_err(map_tr_err)
}

/// Link an entity to a summary. Re-linking the same pair is ignored.
pub async fn link_mention(
    db: &Database,
    entity_id: &str,
    summary_id: &str,
) -> Result<(), ParleyError> {
    let entity_id = entity_id.to_string();
    let summary_id = summary_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO entity_mentions (entity_id, summary_id) VALUES (?1, ?2)",
                params![entity_id, summary_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List entities, most mentioned first.
pub async fn list_entities(
    db: &Database,
    filter: &EntityFilter,
) -> Result<Vec<KnowledgeEntity>, ParleyError> {
    let entity_type = filter.entity_type.map(|t| t.to_string());
    let limit = filter.limit.map(i64::from).unwrap_or(-1);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTITY_COLUMNS} FROM knowledge_entities
                 WHERE ?1 IS NULL OR entity_type = ?1
                 ORDER BY mention_count DESC, last_seen DESC, name ASC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![entity_type, limit], entity_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Mention links for one summary.
pub async fn mentions_for_summary(
    db: &Database,
    summary_id: &str,
) -> Result<Vec<EntityMention>, ParleyError> {
    let summary_id = summary_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT entity_id, summary_id FROM entity_mentions
                 WHERE summary_id = ?1 ORDER BY entity_id",
            )?;
            let rows = stmt.query_map(params![summary_id], |row| {
                Ok(EntityMention {
                    entity_id: row.get(0)?,
                    summary_id: row.get(1)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete an entity and its mention links.
pub async fn delete_entity(db: &Database, id: &str) -> Result<bool, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let deleted =
                conn.execute("DELETE FROM knowledge_entities WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}
