// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge compaction.
//!
//! Merges uncompacted meeting summaries into the singleton knowledge profile
//! with one LLM call. A run either replaces the profile's derived lists
//! wholesale or leaves the stored profile untouched.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parley_config::model::CompactionConfig;
use parley_context::ContextAssembler;
use parley_core::{
    ChatMessage, EventBus, FeatureType, KnowledgeProfile, KnowledgeStore, MeetingSummary,
    ParleyError, ProviderAdapter, ProviderRequest, SortOrder, SummaryFilter,
};
use strum::Display;
use tracing::{debug, info, warn};

use crate::contract::parse_profile_response;
use crate::llm::{collect_completion, publish_usage};

/// System prompt for knowledge compaction.
const COMPACTION_PROMPT: &str = r#"You maintain a compact knowledge profile of a user, built from summaries of their meetings and conversations.

You are given the current profile (possibly empty) and new meeting summaries, oldest first. Produce an updated profile that merges both. Prefer newer information when they conflict. Drop people, projects, and terms that no longer matter.

Return ONLY a raw JSON object. Do not wrap it in markdown code fences and do not write anything before or after it.

Fields:
- "summary": a short paragraph describing the user, their work, and current focus
- "key_people": up to 10 objects {"name", "role", "relationship"}
- "key_projects": up to 8 objects {"name", "status", "description"}, where "status" is e.g. "active", "paused", or "completed"
- "terminology": up to 10 objects {"term", "meaning"}
- "recent_goals": up to 10 strings
- "recent_decisions": up to 10 strings
- "recent_team_updates": up to 10 strings"#;

const COMPACTION_TEMPERATURE: f32 = 0.2;

/// Why [`KnowledgeCompactor::should_compact`] decided what it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CompactionReason {
    /// Uncompacted summaries reached the hard cap.
    ThresholdReached,
    /// The compaction interval elapsed with new summaries waiting.
    IntervalElapsed,
    /// No compaction has run yet and summaries exist.
    FirstRun,
    /// There are no summaries newer than the last compaction.
    NothingNew,
    /// New summaries exist but neither threshold is met.
    NotDue,
    /// The store could not be read.
    StoreUnavailable,
}

/// Outcome of the compaction gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionDecision {
    pub should_run: bool,
    pub reason: CompactionReason,
    pub uncompacted: u64,
}

impl CompactionDecision {
    fn run(reason: CompactionReason, uncompacted: u64) -> Self {
        Self {
            should_run: true,
            reason,
            uncompacted,
        }
    }

    fn skip(reason: CompactionReason, uncompacted: u64) -> Self {
        Self {
            should_run: false,
            reason,
            uncompacted,
        }
    }
}

/// Decide whether to compact given persisted state at `now`.
pub fn decide(
    last_compacted: Option<DateTime<Utc>>,
    uncompacted: u64,
    now: DateTime<Utc>,
    config: &CompactionConfig,
) -> CompactionDecision {
    if uncompacted >= u64::from(config.max_uncompacted) {
        return CompactionDecision::run(CompactionReason::ThresholdReached, uncompacted);
    }
    if uncompacted == 0 {
        return CompactionDecision::skip(CompactionReason::NothingNew, 0);
    }
    match last_compacted {
        None => CompactionDecision::run(CompactionReason::FirstRun, uncompacted),
        Some(last) if (now - last).num_days() >= i64::from(config.interval_days) => {
            CompactionDecision::run(CompactionReason::IntervalElapsed, uncompacted)
        }
        Some(_) => CompactionDecision::skip(CompactionReason::NotDue, uncompacted),
    }
}

fn render_list(out: &mut String, label: &str, items: &[String]) {
    if !items.is_empty() {
        let _ = writeln!(out, "   {label}: {}", items.join("; "));
    }
}

fn render_prompt(existing: &KnowledgeProfile, summaries: &[MeetingSummary]) -> String {
    let mut out = String::from("Current profile:\n");
    match existing.summary.as_deref() {
        Some(_) => match serde_json::to_string_pretty(&ProfileView::from(existing)) {
            Ok(json) => out.push_str(&json),
            Err(_) => out.push_str("(unavailable)"),
        },
        None => out.push_str("(none yet)"),
    }

    let _ = write!(out, "\n\nNew meeting summaries ({}):\n", summaries.len());
    for (i, s) in summaries.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. [{}] {}",
            i + 1,
            s.created_at.format("%Y-%m-%d"),
            s.summary
        );
        render_list(&mut out, "Topics", &s.topics);
        render_list(&mut out, "Goals", &s.goals);
        render_list(&mut out, "Decisions", &s.decisions);
        render_list(&mut out, "Action items", &s.action_items);
        render_list(&mut out, "Next steps", &s.next_steps);
        render_list(&mut out, "Team updates", &s.team_updates);
        render_list(&mut out, "Participants", &s.participants);
    }
    out
}

/// The model-facing part of a profile, without bookkeeping fields.
#[derive(serde::Serialize)]
struct ProfileView<'a> {
    summary: &'a str,
    key_people: &'a [parley_core::KeyPerson],
    key_projects: &'a [parley_core::KeyProject],
    terminology: &'a [parley_core::Term],
    recent_goals: &'a [String],
    recent_decisions: &'a [String],
    recent_team_updates: &'a [String],
}

impl<'a> From<&'a KnowledgeProfile> for ProfileView<'a> {
    fn from(p: &'a KnowledgeProfile) -> Self {
        Self {
            summary: p.summary.as_deref().unwrap_or_default(),
            key_people: &p.key_people,
            key_projects: &p.key_projects,
            terminology: &p.terminology,
            recent_goals: &p.recent_goals,
            recent_decisions: &p.recent_decisions,
            recent_team_updates: &p.recent_team_updates,
        }
    }
}

/// Folds meeting summaries into the knowledge profile.
pub struct KnowledgeCompactor {
    store: Arc<dyn KnowledgeStore>,
    assembler: Arc<ContextAssembler>,
    provider: Option<Arc<dyn ProviderAdapter>>,
    events: EventBus,
    config: CompactionConfig,
}

impl KnowledgeCompactor {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        assembler: Arc<ContextAssembler>,
        provider: Option<Arc<dyn ProviderAdapter>>,
        events: EventBus,
        config: CompactionConfig,
    ) -> Self {
        Self {
            store,
            assembler,
            provider,
            events,
            config,
        }
    }

    /// Count summaries created after the profile's last compaction.
    async fn uncompacted(&self) -> Result<(Option<DateTime<Utc>>, u64), ParleyError> {
        let last_compacted = self
            .store
            .get_profile()
            .await?
            .and_then(|p| p.last_compacted);
        let count = self
            .store
            .count_summaries(&SummaryFilter {
                created_after: last_compacted,
                ..SummaryFilter::default()
            })
            .await?;
        Ok((last_compacted, count))
    }

    /// Whether a compaction run is due. Reads state only.
    pub async fn should_compact(&self) -> CompactionDecision {
        match self.uncompacted().await {
            Ok((last_compacted, count)) => decide(last_compacted, count, Utc::now(), &self.config),
            Err(e) => {
                warn!(error = %e, "could not read compaction state");
                CompactionDecision::skip(CompactionReason::StoreUnavailable, 0)
            }
        }
    }

    /// Merge uncompacted summaries into the profile.
    ///
    /// Returns the unchanged profile when there is nothing new, the merged
    /// profile on success, and `None` when the run failed and nothing was
    /// written.
    pub async fn compact_knowledge(
        &self,
        provider: Option<&dyn ProviderAdapter>,
    ) -> Option<KnowledgeProfile> {
        // Summaries created while the model runs stay uncompacted for the next run.
        // Anything fed to this run is marked compacted even if it landed after the start.
        let started_at = Utc::now();

        let existing = match self.store.get_profile().await {
            Ok(profile) => profile.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "failed to read knowledge profile");
                return None;
            }
        };

        let mut summaries = match self
            .store
            .list_summaries(&SummaryFilter {
                created_after: existing.last_compacted,
                limit: Some(self.config.batch_size),
                order: SortOrder::NewestFirst,
                ..SummaryFilter::default()
            })
            .await
        {
            Ok(summaries) => summaries,
            Err(e) => {
                warn!(error = %e, "failed to read summaries for compaction");
                return None;
            }
        };

        if summaries.is_empty() {
            debug!("no new summaries to compact");
            return Some(existing);
        }
        summaries.reverse();

        let Some(provider) = provider.or(self.provider.as_deref()) else {
            debug!("no provider configured, skipping compaction");
            return None;
        };

        let request = ProviderRequest {
            model: None,
            system_prompt: Some(COMPACTION_PROMPT.to_string()),
            messages: vec![ChatMessage::user(render_prompt(&existing, &summaries))],
            max_tokens: self.config.max_tokens,
            temperature: Some(COMPACTION_TEMPERATURE),
        };

        let completion = match collect_completion(provider, request.clone(), None).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(error = %e, "compaction call failed");
                return None;
            }
        };
        publish_usage(
            &self.events,
            FeatureType::Compaction,
            &request,
            &completion,
            None,
        );

        let update = match parse_profile_response(&completion.text) {
            Ok(update) => update,
            Err(e) => {
                warn!(error = %e, "failed to parse compaction response");
                debug!("raw response: {}", completion.text);
                return None;
            }
        };

        let processed = u32::try_from(summaries.len()).unwrap_or(u32::MAX);
        let newest_fed = summaries.iter().map(|s| s.created_at).max();
        let last_compacted = newest_fed.map_or(started_at, |newest| newest.max(started_at));
        let profile = KnowledgeProfile {
            summary: Some(update.summary),
            key_people: update.key_people,
            key_projects: update.key_projects,
            terminology: update.terminology,
            recent_goals: update.recent_goals,
            recent_decisions: update.recent_decisions,
            recent_team_updates: update.recent_team_updates,
            last_compacted: Some(last_compacted),
            source_count: existing.source_count.saturating_add(processed),
            updated_at: None,
        };

        if let Err(e) = self.store.save_profile(&profile).await {
            warn!(error = %e, "failed to save compacted profile");
            return None;
        }

        self.assembler.invalidate_cache();
        info!(
            summaries = processed,
            source_count = profile.source_count,
            "knowledge profile compacted"
        );

        match self.store.get_profile().await {
            Ok(Some(saved)) => Some(saved),
            _ => Some(profile),
        }
    }

    /// Compact when the gate says so. Returns whether a run succeeded.
    ///
    /// Safe to call as often as wanted; the gate keeps it cheap.
    pub async fn run_compaction_if_needed(&self, provider: Option<&dyn ProviderAdapter>) -> bool {
        let decision = self.should_compact().await;
        if !decision.should_run {
            debug!(reason = %decision.reason, uncompacted = decision.uncompacted, "compaction not needed");
            return false;
        }

        info!(reason = %decision.reason, uncompacted = decision.uncompacted, "running compaction");
        self.compact_knowledge(provider).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use parley_config::model::ContextMemoryConfig;
    use parley_config::settings::InMemorySettings;
    use parley_core::{KeyPerson, NewMeetingSummary};
    use parley_storage::SqliteKnowledgeStore;
    use parley_test_utils::MockProvider;
    use parley_test_utils::fixtures::{PROFILE_RESPONSE, new_summary};
    use tracing_test::traced_test;

    fn config() -> CompactionConfig {
        CompactionConfig::default()
    }

    #[test]
    fn threshold_always_runs() {
        let now = Utc::now();
        let d = decide(Some(now), 50, now, &config());
        assert!(d.should_run);
        assert_eq!(d.reason, CompactionReason::ThresholdReached);
    }

    #[test]
    fn interval_runs_only_with_new_summaries() {
        let now = Utc::now();
        let last = now - Duration::days(31);
        assert_eq!(
            decide(Some(last), 1, now, &config()).reason,
            CompactionReason::IntervalElapsed
        );
        assert!(!decide(Some(last), 0, now, &config()).should_run);
    }

    #[test]
    fn recent_compaction_below_threshold_waits() {
        let now = Utc::now();
        let d = decide(Some(now - Duration::days(1)), 10, now, &config());
        assert!(!d.should_run);
        assert_eq!(d.reason, CompactionReason::NotDue);
        assert_eq!(d.uncompacted, 10);
    }

    #[test]
    fn first_run_needs_at_least_one_summary() {
        let now = Utc::now();
        assert_eq!(decide(None, 1, now, &config()).reason, CompactionReason::FirstRun);
        assert_eq!(decide(None, 0, now, &config()).reason, CompactionReason::NothingNew);
    }

    #[test]
    fn reason_renders_snake_case() {
        assert_eq!(CompactionReason::ThresholdReached.to_string(), "threshold_reached");
    }

    struct Fixture {
        store: Arc<dyn KnowledgeStore>,
        assembler: Arc<ContextAssembler>,
        provider: Arc<MockProvider>,
        compactor: KnowledgeCompactor,
    }

    async fn fixture(responses: Vec<String>) -> Fixture {
        let store: Arc<dyn KnowledgeStore> =
            Arc::new(SqliteKnowledgeStore::in_memory().await.unwrap());
        let assembler = Arc::new(ContextAssembler::new(
            store.clone(),
            Arc::new(InMemorySettings::new()),
            ContextMemoryConfig::default(),
        ));
        let provider = Arc::new(MockProvider::with_responses(responses));
        let compactor = KnowledgeCompactor::new(
            store.clone(),
            assembler.clone(),
            Some(provider.clone() as Arc<dyn ProviderAdapter>),
            EventBus::new(),
            config(),
        );
        Fixture {
            store,
            assembler,
            provider,
            compactor,
        }
    }

    async fn seed(store: &dyn KnowledgeStore, prefix: &str, count: usize, created_at: DateTime<Utc>) {
        for i in 0..count {
            let summary: NewMeetingSummary = new_summary(
                &format!("{prefix}-{i}"),
                created_at + Duration::seconds(i as i64),
            );
            store.create_summary(&summary).await.unwrap();
        }
    }

    #[tokio::test]
    async fn sixty_summaries_trigger_compaction() {
        let fx = fixture(vec![PROFILE_RESPONSE.into()]).await;
        seed(fx.store.as_ref(), "conv", 60, Utc::now() - Duration::hours(2)).await;
        fx.assembler.build_context_string().await;

        let decision = fx.compactor.should_compact().await;
        assert!(decision.should_run);
        assert_eq!(decision.reason, CompactionReason::ThresholdReached);
        assert_eq!(decision.uncompacted, 60);

        let before = Utc::now();
        assert!(fx.compactor.run_compaction_if_needed(None).await);

        let profile = fx.store.get_profile().await.unwrap().unwrap();
        assert_eq!(profile.source_count, 60);
        let last = profile.last_compacted.unwrap();
        assert!((last - before).num_seconds().abs() < 5);
        assert!(!fx.assembler.is_cached());

        let after = fx.compactor.should_compact().await;
        assert!(!after.should_run);
        assert_eq!(after.uncompacted, 0);
    }

    #[tokio::test]
    async fn interval_gate_against_stored_profile() {
        let fx = fixture(vec![]).await;
        let profile = KnowledgeProfile {
            summary: Some("existing".into()),
            last_compacted: Some(Utc::now() - Duration::days(31)),
            ..KnowledgeProfile::default()
        };
        fx.store.save_profile(&profile).await.unwrap();
        seed(fx.store.as_ref(), "conv", 1, Utc::now()).await;
        assert!(fx.compactor.should_compact().await.should_run);

        let recent = KnowledgeProfile {
            last_compacted: Some(Utc::now() - Duration::days(1)),
            ..profile
        };
        fx.store.save_profile(&recent).await.unwrap();
        seed(fx.store.as_ref(), "later", 9, Utc::now() + Duration::seconds(5)).await;
        let decision = fx.compactor.should_compact().await;
        assert!(!decision.should_run);
        assert_eq!(decision.reason, CompactionReason::NotDue);
        assert_eq!(decision.uncompacted, 10);
    }

    #[tokio::test]
    async fn fed_summaries_newer_than_the_run_are_not_counted_twice() {
        let fx = fixture(vec![PROFILE_RESPONSE.into(), PROFILE_RESPONSE.into()]).await;
        let landed = Utc::now() + Duration::minutes(10);
        seed(fx.store.as_ref(), "late", 2, landed).await;

        let profile = fx.compactor.compact_knowledge(None).await.unwrap();
        assert_eq!(profile.source_count, 2);
        assert!(profile.last_compacted.unwrap() > landed + Duration::milliseconds(500));

        let again = fx.compactor.compact_knowledge(None).await.unwrap();
        assert_eq!(again.source_count, 2);
        assert_eq!(fx.provider.call_count(), 1);
        assert_eq!(fx.compactor.should_compact().await.uncompacted, 0);
    }

    #[tokio::test]
    async fn nothing_new_returns_existing_profile_without_a_call() {
        let fx = fixture(vec![PROFILE_RESPONSE.into()]).await;
        let existing = KnowledgeProfile {
            summary: Some("steady".into()),
            last_compacted: Some(Utc::now()),
            source_count: 4,
            ..KnowledgeProfile::default()
        };
        fx.store.save_profile(&existing).await.unwrap();

        let profile = fx.compactor.compact_knowledge(None).await.unwrap();
        assert_eq!(profile.summary.as_deref(), Some("steady"));
        assert_eq!(profile.source_count, 4);
        assert_eq!(fx.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn compaction_replaces_lists_and_accumulates_source_count() {
        let fx = fixture(vec![PROFILE_RESPONSE.into()]).await;
        let existing = KnowledgeProfile {
            summary: Some("old".into()),
            key_people: vec![KeyPerson {
                name: "Stale Person".into(),
                role: String::new(),
                relationship: String::new(),
            }],
            last_compacted: Some(Utc::now() - Duration::days(40)),
            source_count: 7,
            ..KnowledgeProfile::default()
        };
        fx.store.save_profile(&existing).await.unwrap();
        seed(fx.store.as_ref(), "conv", 3, Utc::now() - Duration::days(2)).await;

        let profile = fx.compactor.compact_knowledge(None).await.unwrap();
        assert_eq!(profile.source_count, 10);
        assert!(profile.key_people.iter().all(|p| p.name != "Stale Person"));
        assert!(profile.key_people.iter().any(|p| p.name == "Sarah"));

        let request = fx.provider.last_request().await.unwrap();
        let prompt = &request.messages[0].content;
        assert!(prompt.contains("Stale Person"));
        assert!(prompt.contains("New meeting summaries (3)"));
    }

    #[tokio::test]
    async fn only_newest_batch_is_fed_in_chronological_order() {
        let fx = fixture(vec![PROFILE_RESPONSE.into()]).await;
        let compactor = KnowledgeCompactor::new(
            fx.store.clone(),
            fx.assembler.clone(),
            Some(fx.provider.clone() as Arc<dyn ProviderAdapter>),
            EventBus::new(),
            CompactionConfig {
                batch_size: 2,
                ..config()
            },
        );
        let base = Utc::now() - Duration::hours(1);
        for (i, text) in ["first", "second", "third"].iter().enumerate() {
            let mut summary = new_summary(&format!("conv-{i}"), base + Duration::minutes(i as i64));
            summary.summary = (*text).to_string();
            fx.store.create_summary(&summary).await.unwrap();
        }

        let profile = compactor.compact_knowledge(None).await.unwrap();
        assert_eq!(profile.source_count, 2);

        let prompt = fx.provider.last_request().await.unwrap().messages[0]
            .content
            .clone();
        assert!(!prompt.contains("] first"));
        let second = prompt.find("] second").unwrap();
        let third = prompt.find("] third").unwrap();
        assert!(second < third);
    }

    #[tokio::test]
    #[traced_test]
    async fn malformed_response_leaves_profile_untouched() {
        let fx = fixture(vec!["not json".into()]).await;
        let existing = KnowledgeProfile {
            summary: Some("keep me".into()),
            source_count: 2,
            ..KnowledgeProfile::default()
        };
        fx.store.save_profile(&existing).await.unwrap();
        seed(fx.store.as_ref(), "conv", 2, Utc::now() - Duration::hours(1)).await;

        assert!(fx.compactor.compact_knowledge(None).await.is_none());
        assert!(logs_contain("failed to parse compaction response"));

        let stored = fx.store.get_profile().await.unwrap().unwrap();
        assert_eq!(stored.summary.as_deref(), Some("keep me"));
        assert_eq!(stored.source_count, 2);
        assert!(stored.last_compacted.is_none());
    }

    #[tokio::test]
    async fn empty_summary_in_response_is_rejected() {
        let fx = fixture(vec![r#"{"summary": "", "key_people": []}"#.into()]).await;
        seed(fx.store.as_ref(), "conv", 1, Utc::now()).await;
        assert!(fx.compactor.compact_knowledge(None).await.is_none());
        assert!(fx.store.get_profile().await.unwrap().and_then(|p| p.summary).is_none());
    }

    #[tokio::test]
    async fn no_provider_skips_run() {
        let fx = fixture(vec![]).await;
        let compactor = KnowledgeCompactor::new(
            fx.store.clone(),
            fx.assembler.clone(),
            None,
            EventBus::new(),
            config(),
        );
        seed(fx.store.as_ref(), "conv", 1, Utc::now()).await;
        assert!(!compactor.run_compaction_if_needed(None).await);
    }

    #[tokio::test]
    async fn gate_closed_makes_no_call() {
        let fx = fixture(vec![PROFILE_RESPONSE.into()]).await;
        assert!(!fx.compactor.run_compaction_if_needed(None).await);
        assert_eq!(fx.provider.call_count(), 0);
    }
}
