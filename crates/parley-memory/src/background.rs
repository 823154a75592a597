// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fire-and-forget maintenance off the prompt path.
//!
//! Jobs go onto a bounded queue drained by one worker task, so summarization
//! and compaction never run in parallel within a process. Cancelling the token
//! stops the worker between jobs; a job already started runs to completion.

use std::sync::Arc;

use parley_core::ChatMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::service::ContextMemory;

const QUEUE_CAPACITY: usize = 64;

/// One unit of background maintenance.
#[derive(Debug, Clone)]
pub enum MaintenanceJob {
    /// Summarize a finished conversation.
    Summarize {
        conversation_id: String,
        messages: Vec<ChatMessage>,
    },
    /// Compact only when the thresholds say so.
    CompactIfNeeded,
    /// Compact regardless of the thresholds.
    Compact,
}

impl MaintenanceJob {
    fn kind(&self) -> &'static str {
        match self {
            Self::Summarize { .. } => "summarize",
            Self::CompactIfNeeded => "compact_if_needed",
            Self::Compact => "compact",
        }
    }
}

/// Sending half of the maintenance queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MaintenanceQueue {
    tx: mpsc::Sender<MaintenanceJob>,
}

impl MaintenanceQueue {
    /// Spawn the worker. It exits when `cancel` fires or every queue handle is dropped.
    pub fn spawn(memory: Arc<ContextMemory>, cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let handle = tokio::spawn(run_worker(memory, rx, cancel));
        (Self { tx }, handle)
    }

    /// Enqueue a job without waiting. Returns `false` if the queue is full or closed.
    pub fn submit(&self, job: MaintenanceJob) -> bool {
        let kind = job.kind();
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(job = kind, "maintenance queue full, dropping job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(job = kind, "maintenance worker stopped, dropping job");
                false
            }
        }
    }

    /// Queue a conversation for summarization, then a gated compaction.
    pub fn conversation_finished(&self, conversation_id: &str, messages: Vec<ChatMessage>) -> bool {
        let queued = self.submit(MaintenanceJob::Summarize {
            conversation_id: conversation_id.to_string(),
            messages,
        });
        queued && self.submit(MaintenanceJob::CompactIfNeeded)
    }
}

async fn run_worker(
    memory: Arc<ContextMemory>,
    mut rx: mpsc::Receiver<MaintenanceJob>,
    cancel: CancellationToken,
) {
    debug!("maintenance worker started");
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("maintenance worker cancelled");
                break;
            }
            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        run_job(&memory, job).await;
    }
    debug!("maintenance worker stopped");
}

async fn run_job(memory: &ContextMemory, job: MaintenanceJob) {
    let kind = job.kind();
    let done = match job {
        MaintenanceJob::Summarize {
            conversation_id,
            messages,
        } => {
            memory
                .summarize_conversation(&conversation_id, &messages)
                .await
        }
        MaintenanceJob::CompactIfNeeded => memory.run_compaction_if_needed().await,
        MaintenanceJob::Compact => memory.compact_knowledge().await.is_some(),
    };
    debug!(job = kind, done, "maintenance job finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_config::ParleyConfig;
    use parley_config::settings::InMemorySettings;
    use parley_core::{KnowledgeStore, ProviderAdapter};
    use parley_storage::SqliteKnowledgeStore;
    use parley_test_utils::MockProvider;
    use parley_test_utils::fixtures::{PROFILE_RESPONSE, PROJECT_ALPHA_SUMMARY, make_conversation};

    async fn memory(responses: Vec<String>) -> (Arc<ContextMemory>, Arc<MockProvider>) {
        let store: Arc<dyn KnowledgeStore> =
            Arc::new(SqliteKnowledgeStore::in_memory().await.unwrap());
        let provider = Arc::new(MockProvider::with_responses(responses));
        let memory = ContextMemory::new(
            store,
            Arc::new(InMemorySettings::new()),
            Some(provider.clone() as Arc<dyn ProviderAdapter>),
            &ParleyConfig::default(),
        );
        (Arc::new(memory), provider)
    }

    #[tokio::test]
    async fn worker_drains_queue_before_exiting() {
        let (memory, provider) =
            memory(vec![PROJECT_ALPHA_SUMMARY.into(), PROFILE_RESPONSE.into()]).await;
        let (queue, handle) = MaintenanceQueue::spawn(memory.clone(), CancellationToken::new());

        assert!(queue.conversation_finished("conv-1", make_conversation(2)));
        drop(queue);
        handle.await.unwrap();

        // First compaction runs as soon as one summary exists.
        assert_eq!(provider.call_count(), 2);
        let stats = memory.stats().await.unwrap();
        assert_eq!(stats.summaries, 1);
        assert_eq!(stats.source_count, 1);
        assert!(stats.last_compacted.is_some());
    }

    #[tokio::test]
    async fn jobs_run_one_at_a_time_in_order() {
        let (memory, provider) = memory(vec![
            PROJECT_ALPHA_SUMMARY.into(),
            PROJECT_ALPHA_SUMMARY.into(),
        ])
        .await;
        let (queue, handle) = MaintenanceQueue::spawn(memory.clone(), CancellationToken::new());

        for _ in 0..2 {
            queue.submit(MaintenanceJob::Summarize {
                conversation_id: "conv-1".into(),
                messages: make_conversation(2),
            });
        }
        drop(queue);
        handle.await.unwrap();

        // The second job sees the first one's summary and skips the call.
        assert_eq!(provider.call_count(), 1);
        assert_eq!(memory.stats().await.unwrap().summaries, 1);
    }

    #[tokio::test]
    async fn cancelled_worker_rejects_new_jobs() {
        let (memory, provider) = memory(vec![PROJECT_ALPHA_SUMMARY.into()]).await;
        let cancel = CancellationToken::new();
        let (queue, handle) = MaintenanceQueue::spawn(memory, cancel.clone());

        cancel.cancel();
        handle.await.unwrap();

        assert!(!queue.submit(MaintenanceJob::Compact));
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn job_kinds_are_stable() {
        assert_eq!(MaintenanceJob::Compact.kind(), "compact");
        assert_eq!(MaintenanceJob::CompactIfNeeded.kind(), "compact_if_needed");
    }
}
