// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cached, token-budgeted assembly of the context block.
//!
//! The block is rebuilt from the knowledge store at most once per TTL unless
//! the cache is invalidated. Cache state lives in each [`ContextAssembler`],
//! so separate instances never share it.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use parley_config::model::ContextMemoryConfig;
use parley_config::settings::{ContextMemorySettings, ContextMemorySettingsUpdate, SettingsStore};
use parley_core::{EntityFilter, KnowledgeStore, ParleyError, SortOrder, SummaryFilter};
use tracing::{debug, warn};

use crate::sections::{
    ENTITY_LIMIT, RECENT_SUMMARY_LIMIT, entities_section, profile_section,
    recent_meetings_section, recent_section_budget,
};
use crate::tokens::estimate_tokens;

/// Heading placed above the assembled sections.
pub const CONTEXT_HEADER: &str = "## Context About the User";
/// Separator placed after the assembled sections.
pub const CONTEXT_FOOTER: &str = "---";

#[derive(Debug, Clone)]
struct CachedContext {
    text: String,
    built_at: Instant,
}

/// Builds the context block injected into every outbound system prompt.
pub struct ContextAssembler {
    store: Arc<dyn KnowledgeStore>,
    settings: Arc<dyn SettingsStore>,
    defaults: ContextMemoryConfig,
    ttl: Duration,
    cache: Mutex<Option<CachedContext>>,
}

impl ContextAssembler {
    /// Create an assembler. The cache TTL comes from `defaults.cache_ttl_secs`.
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        settings: Arc<dyn SettingsStore>,
        defaults: ContextMemoryConfig,
    ) -> Self {
        let ttl = Duration::from_secs(defaults.cache_ttl_secs);
        Self {
            store,
            settings,
            defaults,
            ttl,
            cache: Mutex::new(None),
        }
    }

    /// Override the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Current settings, falling back to config defaults.
    pub fn get_settings(&self) -> ContextMemorySettings {
        ContextMemorySettings::load(self.settings.as_ref(), &self.defaults)
    }

    /// Write the given fields and drop the cached block.
    pub fn set_settings(&self, update: &ContextMemorySettingsUpdate) -> Result<(), ParleyError> {
        update.apply(self.settings.as_ref())?;
        self.invalidate_cache();
        Ok(())
    }

    /// Drop the cached block. Safe to call at any time.
    pub fn invalidate_cache(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if cache.take().is_some() {
            debug!("context cache invalidated");
        }
    }

    /// Whether a cached block is present and still fresh.
    pub fn is_cached(&self) -> bool {
        self.cached().is_some()
    }

    fn cached(&self) -> Option<String> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .filter(|c| c.built_at.elapsed() < self.ttl)
            .map(|c| c.text.clone())
    }

    fn store_cache(&self, text: &str) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = Some(CachedContext {
            text: text.to_string(),
            built_at: Instant::now(),
        });
    }

    /// The context block, or `""` when disabled, empty, or on any failure.
    ///
    /// Never fails: a broken store degrades the prompt to no context.
    pub async fn build_context_string(&self) -> String {
        let settings = self.get_settings();
        if !settings.enabled {
            return String::new();
        }

        if let Some(text) = self.cached() {
            debug!("context cache hit");
            return text;
        }

        match self.assemble(&settings).await {
            Ok(text) => {
                self.store_cache(&text);
                debug!(tokens = estimate_tokens(&text), "context rebuilt");
                text
            }
            Err(e) => {
                warn!(error = %e, "context assembly failed, continuing without context");
                String::new()
            }
        }
    }

    /// The context block for prompt injection, `None` when there is nothing to inject.
    pub async fn get_context_for_injection(&self) -> Option<String> {
        let text = self.build_context_string().await;
        (!text.is_empty()).then_some(text)
    }

    async fn assemble(&self, settings: &ContextMemorySettings) -> Result<String, ParleyError> {
        let mut remaining = settings.max_tokens as usize;
        let mut sections = Vec::with_capacity(3);

        if let Some(profile) = self.store.get_profile().await? {
            let section = profile_section(&profile);
            if !section.is_empty() {
                remaining = remaining.saturating_sub(estimate_tokens(&section));
                sections.push(section);
            }
        }

        // A window reaching past the representable range covers everything.
        let window_start = chrono::Duration::try_days(i64::from(settings.days))
            .and_then(|window| Utc::now().checked_sub_signed(window));
        let recent = self
            .store
            .list_summaries(&SummaryFilter {
                created_since: window_start,
                created_after: None,
                limit: Some(RECENT_SUMMARY_LIMIT),
                order: SortOrder::NewestFirst,
            })
            .await?;
        let section = recent_meetings_section(&recent, recent_section_budget(remaining));
        if !section.is_empty() {
            remaining = remaining.saturating_sub(estimate_tokens(&section));
            sections.push(section);
        }

        let entities = self
            .store
            .list_entities(&EntityFilter {
                entity_type: None,
                limit: Some(ENTITY_LIMIT),
            })
            .await?;
        let section = entities_section(&entities, remaining);
        if !section.is_empty() {
            sections.push(section);
        }

        if sections.is_empty() {
            return Ok(String::new());
        }
        Ok(format!(
            "{CONTEXT_HEADER}\n\n{}\n\n{CONTEXT_FOOTER}",
            sections.join("\n\n")
        ))
    }
}
