// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Meeting summary CRUD operations.

use chrono::Utc;
use parley_core::{
    MeetingSummary, NewMeetingSummary, ParleyError, SortOrder, SummaryEdit, SummaryFilter,
};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{SUMMARY_COLUMNS, format_ts, summary_from_row, to_json, to_millis};

/// Insert a summary. Returns `None` if the conversation already has one.
pub async fn create_summary(
    db: &Database,
    new: &NewMeetingSummary,
) -> Result<Option<MeetingSummary>, ParleyError> {
    let now = to_millis(Utc::now());
    let summary = MeetingSummary {
        id: uuid::Uuid::new_v4().to_string(),
        conversation_id: new.conversation_id.clone(),
        summary: new.summary.clone(),
        topics: new.topics.clone(),
        goals: new.goals.clone(),
        action_items: new.action_items.clone(),
        next_steps: new.next_steps.clone(),
        decisions: new.decisions.clone(),
        team_updates: new.team_updates.clone(),
        participants: new.participants.clone(),
        exchange_count: new.exchange_count,
        duration_seconds: new.duration_seconds,
        created_at: new.created_at.map(to_millis).unwrap_or(now),
        updated_at: now,
    };

    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO meeting_summaries (id, conversation_id, summary, topics, goals,
                     action_items, next_steps, decisions, team_updates, participants,
                     exchange_count, duration_seconds, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(conversation_id) DO NOTHING",
                params![
                    summary.id,
                    summary.conversation_id,
                    summary.summary,
                    to_json(&summary.topics)?,
                    to_json(&summary.goals)?,
                    to_json(&summary.action_items)?,
                    to_json(&summary.next_steps)?,
                    to_json(&summary.decisions)?,
                    to_json(&summary.team_updates)?,
                    to_json(&summary.participants)?,
                    summary.exchange_count,
                    summary.duration_seconds.map(|d| d as i64),
                    format_ts(summary.created_at),
                    format_ts(summary.updated_at),
                ],
            )?;
            Ok((inserted > 0).then_some(summary))
        })
        .await
        .map_err(map_tr_err)
}

/// Get a summary by ID.
pub async fn get_summary(db: &Database, id: &str) -> Result<Option<MeetingSummary>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SUMMARY_COLUMNS} FROM meeting_summaries WHERE id = ?1"),
                params![id],
                summary_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Get the summary for a conversation, if one exists.
pub async fn get_summary_by_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<MeetingSummary>, ParleyError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {SUMMARY_COLUMNS} FROM meeting_summaries WHERE conversation_id = ?1"
                ),
                params![conversation_id],
                summary_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Shared WHERE clause: `?1` inclusive lower bound, `?2` exclusive lower bound.
const FILTER_CLAUSE: &str =
    "(?1 IS NULL OR created_at >= ?1) AND (?2 IS NULL OR created_at > ?2)";

/// List summaries matching the filter.
pub async fn list_summaries(
    db: &Database,
    filter: &SummaryFilter,
) -> Result<Vec<MeetingSummary>, ParleyError> {
    let since = filter.created_since.map(format_ts);
    let after = filter.created_after.map(format_ts);
    let limit = filter.limit.map(i64::from).unwrap_or(-1);
    let direction = match filter.order {
        SortOrder::NewestFirst => "DESC",
        SortOrder::OldestFirst => "ASC",
    };

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUMMARY_COLUMNS} FROM meeting_summaries
                 WHERE {FILTER_CLAUSE}
                 ORDER BY created_at {direction}, rowid {direction}
                 LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![since, after, limit], summary_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Count summaries matching the filter, ignoring limit and order.
pub async fn count_summaries(db: &Database, filter: &SummaryFilter) -> Result<u64, ParleyError> {
    let since = filter.created_since.map(format_ts);
    let after = filter.created_after.map(format_ts);

    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT COUNT(*) FROM meeting_summaries WHERE {FILTER_CLAUSE}"),
                params![since, after],
                |row| row.get::<_, i64>(0),
            )
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(map_tr_err)
}

/// Apply a manual edit and bump `updated_at`.
pub async fn update_summary(
    db: &Database,
    id: &str,
    edit: &SummaryEdit,
) -> Result<Option<MeetingSummary>, ParleyError> {
    let id = id.to_string();
    let edit = edit.clone();
    let now = to_millis(Utc::now());

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = tx
                .query_row(
                    &format!("SELECT {SUMMARY_COLUMNS} FROM meeting_summaries WHERE id = ?1"),
                    params![id],
                    summary_from_row,
                )
                .optional()?;
            let Some(mut summary) = existing else {
                return Ok(None);
            };

            let SummaryEdit {
                summary: text,
                topics,
                goals,
                action_items,
                next_steps,
                decisions,
                team_updates,
                participants,
            } = edit;
            if let Some(text) = text {
                summary.summary = text;
            }
            if let Some(v) = topics {
                summary.topics = v;
            }
            if let Some(v) = goals {
                summary.goals = v;
            }
            if let Some(v) = action_items {
                summary.action_items = v;
            }
            if let Some(v) = next_steps {
                summary.next_steps = v;
            }
            if let Some(v) = decisions {
                summary.decisions = v;
            }
            if let Some(v) = team_updates {
                summary.team_updates = v;
            }
            if let Some(v) = participants {
                summary.participants = v;
            }
            summary.updated_at = now;

            tx.execute(
                "UPDATE meeting_summaries SET summary = ?1, topics = ?2, goals = ?3,
                     action_items = ?4, next_steps = ?5, decisions = ?6, team_updates = ?7,
                     participants = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    summary.summary,
                    to_json(&summary.topics)?,
                    to_json(&summary.goals)?,
                    to_json(&summary.action_items)?,
                    to_json(&summary.next_steps)?,
                    to_json(&summary.decisions)?,
                    to_json(&summary.team_updates)?,
                    to_json(&summary.participants)?,
                    format_ts(summary.updated_at),
                    summary.id,
                ],
            )?;
            tx.commit()?;
            Ok(Some(summary))
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a summary. Its mention links cascade.
pub async fn delete_summary(db: &Database, id: &str) -> Result<bool, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute("DELETE FROM meeting_summaries WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete the summary belonging to a conversation.
pub async fn delete_summary_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<bool, ParleyError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM meeting_summaries WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn make_summary(conversation_id: &str) -> NewMeetingSummary {
        NewMeetingSummary {
            conversation_id: conversation_id.to_string(),
            summary: format!("Discussed {conversation_id}"),
            topics: vec!["Project Alpha".into(), "Hiring".into()],
            participants: vec!["Sarah".into()],
            exchange_count: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_and_get_summary_roundtrips() {
        let db = setup_db().await;
        let created = create_summary(&db, &make_summary("conv-1"))
            .await
            .unwrap()
            .expect("first insert should succeed");

        let fetched = get_summary(&db, &created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.topics, vec!["Project Alpha", "Hiring"]);

        let by_conv = get_summary_by_conversation(&db, "conv-1").await.unwrap();
        assert_eq!(by_conv.map(|s| s.id), Some(created.id));
    }

    #[tokio::test]
    async fn second_summary_for_conversation_is_rejected_quietly() {
        let db = setup_db().await;
        let first = create_summary(&db, &make_summary("conv-1")).await.unwrap();
        assert!(first.is_some());

        let mut again = make_summary("conv-1");
        again.summary = "A different take".into();
        let second = create_summary(&db, &again).await.unwrap();
        assert!(second.is_none(), "duplicate conversation must not insert");

        let all = list_summaries(&db, &SummaryFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].summary, "Discussed conv-1");
    }

    #[tokio::test]
    async fn list_filters_by_window_and_orders() {
        let db = setup_db().await;
        let now = Utc::now();
        for (i, days_ago) in [40, 10, 2].iter().enumerate() {
            let mut s = make_summary(&format!("conv-{i}"));
            s.created_at = Some(now - Duration::days(*days_ago));
            create_summary(&db, &s).await.unwrap();
        }

        let recent = list_summaries(
            &db,
            &SummaryFilter {
                created_since: Some(now - Duration::days(30)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let ids: Vec<_> = recent.iter().map(|s| s.conversation_id.as_str()).collect();
        assert_eq!(ids, vec!["conv-2", "conv-1"]);

        let oldest = list_summaries(
            &db,
            &SummaryFilter {
                limit: Some(1),
                order: SortOrder::OldestFirst,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(oldest[0].conversation_id, "conv-0");
    }

    #[tokio::test]
    async fn count_uses_exclusive_lower_bound() {
        let db = setup_db().await;
        let pivot = to_millis(Utc::now() - Duration::days(5));
        let mut at_pivot = make_summary("at");
        at_pivot.created_at = Some(pivot);
        let mut after_pivot = make_summary("after");
        after_pivot.created_at = Some(pivot + Duration::seconds(1));
        create_summary(&db, &at_pivot).await.unwrap();
        create_summary(&db, &after_pivot).await.unwrap();

        let filter = SummaryFilter {
            created_after: Some(pivot),
            ..Default::default()
        };
        assert_eq!(count_summaries(&db, &filter).await.unwrap(), 1);
        assert_eq!(count_summaries(&db, &SummaryFilter::default()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let db = setup_db().await;
        let created = create_summary(&db, &make_summary("conv-1")).await.unwrap().unwrap();

        let edit = SummaryEdit {
            summary: Some("Edited by hand".into()),
            decisions: Some(vec!["Ship on Friday".into()]),
            ..Default::default()
        };
        let updated = update_summary(&db, &created.id, &edit).await.unwrap().unwrap();
        assert_eq!(updated.summary, "Edited by hand");
        assert_eq!(updated.decisions, vec!["Ship on Friday"]);
        assert_eq!(updated.topics, created.topics);
        assert!(updated.updated_at >= created.updated_at);

        let missing = update_summary(&db, "nope", &edit).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_by_conversation_frees_the_slot() {
        let db = setup_db().await;
        create_summary(&db, &make_summary("conv-1")).await.unwrap();
        assert!(delete_summary_for_conversation(&db, "conv-1").await.unwrap());
        assert!(!delete_summary_for_conversation(&db, "conv-1").await.unwrap());

        let recreated = create_summary(&db, &make_summary("conv-1")).await.unwrap();
        assert!(recreated.is_some());
        assert!(delete_summary(&db, &recreated.unwrap().id).await.unwrap());
    }
}
