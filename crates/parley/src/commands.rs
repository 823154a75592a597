// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.

use std::sync::Arc;
use std::time::Duration;

use parley_config::model::ParleyConfig;
use parley_config::settings::{
    ContextMemorySettings, ContextMemorySettingsUpdate, FileSettings, SettingsStore,
};
use parley_core::{KnowledgeStore, MemoryStats, ParleyError, ProviderAdapter};
use parley_memory::{ContextMemory, MaintenanceJob, MaintenanceQueue};
use parley_openai::OpenAiProvider;
use parley_storage::SqliteKnowledgeStore;
use serde::Serialize;
use tracing::{debug, info};

use crate::Commands;
use crate::shutdown::install_signal_handler;
use crate::transcript::load_transcript;

/// Structured output for `parley status --json`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub stats: MemoryStats,
    pub settings: ContextMemorySettings,
    pub compaction_due: bool,
    pub compaction_reason: String,
    pub uncompacted: u64,
    pub provider: Option<String>,
}

/// Open the store, settings, and provider described by `config`.
pub async fn open_memory(config: &ParleyConfig) -> Result<Arc<ContextMemory>, ParleyError> {
    let store = SqliteKnowledgeStore::new(config.storage.clone());
    store.initialize().await?;
    let store: Arc<dyn KnowledgeStore> = Arc::new(store);

    let settings: Arc<dyn SettingsStore> = Arc::new(FileSettings::open(&config.settings.path));

    let provider: Option<Arc<dyn ProviderAdapter>> = if config.provider.enabled {
        Some(Arc::new(OpenAiProvider::new(&config.provider)?))
    } else {
        debug!("provider disabled, summarization and compaction will be skipped");
        None
    };

    Ok(Arc::new(ContextMemory::new(store, settings, provider, config)))
}

pub async fn run(command: Commands, config: &ParleyConfig) -> Result<(), ParleyError> {
    let memory = open_memory(config).await?;

    match command {
        Commands::Context => print_context(&memory).await,
        Commands::Summarize {
            conversation,
            transcript,
        } => {
            let messages = load_transcript(&transcript).await?;
            summarize(&memory, &conversation, &messages).await
        }
        Commands::Compact { force } => compact(&memory, force).await,
        Commands::Status { json } => {
            let report = status_report(&memory, config).await?;
            print_status(&report, json)
        }
        Commands::Settings {
            enable,
            disable,
            max_tokens,
            days,
        } => {
            let update = ContextMemorySettingsUpdate {
                enabled: if enable {
                    Some(true)
                } else if disable {
                    Some(false)
                } else {
                    None
                },
                max_tokens,
                days,
            };
            let settings = apply_settings(&memory, &update)?;
            println!("enabled:    {}", settings.enabled);
            println!("max_tokens: {}", settings.max_tokens);
            println!("days:       {}", settings.days);
            Ok(())
        }
        Commands::Forget { conversation } => {
            if memory.forget_conversation(&conversation).await? {
                println!("removed summary for {conversation}");
            } else {
                println!("no summary stored for {conversation}");
            }
            Ok(())
        }
        Commands::Wipe { yes } => {
            if !yes {
                return Err(ParleyError::Config(
                    "refusing to wipe without --yes".into(),
                ));
            }
            memory.wipe().await?;
            println!("context memory wiped");
            Ok(())
        }
        Commands::Watch { interval_secs } => {
            watch(memory, Duration::from_secs(interval_secs.max(1))).await
        }
    }
}

async fn print_context(memory: &ContextMemory) -> Result<(), ParleyError> {
    match memory.get_context_for_injection().await {
        Some(block) => println!("{block}"),
        None => eprintln!("no context to inject (memory empty or disabled)"),
    }
    Ok(())
}

/// Summarize one conversation, reporting why nothing happened when it is skipped.
pub async fn summarize(
    memory: &ContextMemory,
    conversation_id: &str,
    messages: &[parley_core::ChatMessage],
) -> Result<(), ParleyError> {
    if memory
        .store()
        .get_summary_by_conversation(conversation_id)
        .await?
        .is_some()
    {
        println!("{conversation_id}: already summarized");
        return Ok(());
    }
    if !memory.should_summarize(messages) {
        println!("{conversation_id}: too few exchanges to summarize");
        return Ok(());
    }
    if memory.summarize_conversation(conversation_id, messages).await {
        println!("{conversation_id}: summarized");
        Ok(())
    } else {
        Err(ParleyError::Internal(format!(
            "{conversation_id}: not summarized (no provider or unusable response)"
        )))
    }
}

async fn compact(memory: &ContextMemory, force: bool) -> Result<(), ParleyError> {
    if !force {
        let decision = memory.should_compact().await;
        if !decision.should_run {
            println!(
                "compaction not needed ({}, {} uncompacted)",
                decision.reason, decision.uncompacted
            );
            return Ok(());
        }
    }

    match memory.compact_knowledge().await {
        Some(profile) => {
            println!(
                "profile compacted from {} summaries total",
                profile.source_count
            );
            Ok(())
        }
        None => Err(ParleyError::Internal(
            "compaction failed (no provider or unusable response)".into(),
        )),
    }
}

pub async fn status_report(
    memory: &ContextMemory,
    config: &ParleyConfig,
) -> Result<StatusReport, ParleyError> {
    let stats = memory.stats().await?;
    let decision = memory.should_compact().await;
    Ok(StatusReport {
        stats,
        settings: memory.get_settings(),
        compaction_due: decision.should_run,
        compaction_reason: decision.reason.to_string(),
        uncompacted: decision.uncompacted,
        provider: memory
            .has_provider()
            .then(|| format!("{} ({})", config.provider.model, config.provider.base_url)),
    })
}

fn print_status(report: &StatusReport, json: bool) -> Result<(), ParleyError> {
    if json {
        let out = serde_json::to_string_pretty(report)
            .map_err(|e| ParleyError::Internal(format!("failed to serialize status: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    let stats = &report.stats;
    println!("summaries:       {}", stats.summaries);
    println!("entities:        {}", stats.entities);
    println!("mentions:        {}", stats.mentions);
    match stats.last_compacted {
        Some(at) => println!(
            "last compacted:  {} ({} summaries merged)",
            at.format("%Y-%m-%d %H:%M UTC"),
            stats.source_count
        ),
        None => println!("last compacted:  never"),
    }
    println!(
        "compaction:      {} ({}, {} uncompacted)",
        if report.compaction_due { "due" } else { "not due" },
        report.compaction_reason,
        report.uncompacted
    );
    println!(
        "context memory:  {} ({} tokens, {} days)",
        if report.settings.enabled {
            "enabled"
        } else {
            "disabled"
        },
        report.settings.max_tokens,
        report.settings.days
    );
    println!(
        "provider:        {}",
        report.provider.as_deref().unwrap_or("disabled")
    );
    Ok(())
}

/// Apply a settings change and return the effective settings.
pub fn apply_settings(
    memory: &ContextMemory,
    update: &ContextMemorySettingsUpdate,
) -> Result<ContextMemorySettings, ParleyError> {
    if !update.is_empty() {
        memory.set_settings(update)?;
        info!(?update, "context memory settings changed");
    }
    Ok(memory.get_settings())
}

async fn watch(memory: Arc<ContextMemory>, interval: Duration) -> Result<(), ParleyError> {
    let cancel = install_signal_handler();
    let (queue, worker) = MaintenanceQueue::spawn(memory, cancel.clone());

    info!(interval_secs = interval.as_secs(), "watching for compaction");
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                queue.submit(MaintenanceJob::CompactIfNeeded);
            }
        }
    }

    drop(queue);
    worker
        .await
        .map_err(|e| ParleyError::Internal(format!("maintenance worker failed: {e}")))
}
