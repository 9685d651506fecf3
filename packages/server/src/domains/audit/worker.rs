//! Background audit worker.
//!
//! ```text
//! request path ──dispatch──► bounded mpsc ──► AuditWorker
//!                                                  ├─► Judge.audit
//!                                                  └─► BaseAuditSink.record
//! ```
//!
//! Dispatch never blocks and never fails the request: when the queue is full
//! the job is dropped with a warning. Failures inside the worker are logged
//! and dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::judge::Judge;
use super::models::AuditEntry;
use crate::common::ConversationId;
use crate::domains::conversation::ChatMessage;
use crate::domains::workflow::ClassificationLabel;
use crate::kernel::BaseAuditSink;

/// Everything the judge needs about one finished turn.
#[derive(Debug, Clone)]
pub struct AuditJob {
    pub conversation_id: ConversationId,
    pub label: ClassificationLabel,
    pub question: String,
    pub answer: String,
    /// History before this turn.
    pub history: Vec<ChatMessage>,
}

/// Jobs waiting for the judge before new ones are dropped.
pub const AUDIT_QUEUE_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AuditDispatcher {
    tx: mpsc::Sender<AuditJob>,
}

impl AuditDispatcher {
    pub fn dispatch(&self, job: AuditJob) {
        let conversation_id = job.conversation_id;
        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%conversation_id, "Audit queue full, dropping audit job");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(%conversation_id, "Audit worker stopped, dropping audit job");
            }
        }
    }

    /// A dispatcher plus the receiving end, with the default capacity.
    pub fn channel() -> (Self, mpsc::Receiver<AuditJob>) {
        Self::with_capacity(AUDIT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<AuditJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

pub struct AuditWorker {
    rx: mpsc::Receiver<AuditJob>,
    judge: Arc<Judge>,
    sink: Arc<dyn BaseAuditSink>,
}

impl AuditWorker {
    pub fn new(
        rx: mpsc::Receiver<AuditJob>,
        judge: Arc<Judge>,
        sink: Arc<dyn BaseAuditSink>,
    ) -> Self {
        Self { rx, judge, sink }
    }

    /// Start a worker on the runtime and return the dispatcher feeding it.
    pub fn spawn(
        judge: Arc<Judge>,
        sink: Arc<dyn BaseAuditSink>,
        shutdown: CancellationToken,
    ) -> (AuditDispatcher, JoinHandle<()>) {
        let (dispatcher, rx) = AuditDispatcher::channel();
        let handle = tokio::spawn(Self::new(rx, judge, sink).run(shutdown));
        (dispatcher, handle)
    }

    /// Process jobs until every dispatcher is dropped or `shutdown` fires.
    /// An audit in flight at shutdown is abandoned.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("audit worker starting");

        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                job = self.rx.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let conversation_id = job.conversation_id;
            tokio::select! {
                _ = shutdown.cancelled() => {
                    warn!(%conversation_id, "audit cancelled by shutdown");
                    break;
                }
                _ = self.process(job) => {}
            }
        }

        info!("audit worker stopped");
    }

    async fn process(&self, job: AuditJob) {
        debug!(conversation_id = %job.conversation_id, label = %job.label, "auditing answer");

        let record = match self.judge.audit(&job.question, &job.answer, &job.history).await {
            Ok(record) => record,
            Err(e) => {
                warn!(conversation_id = %job.conversation_id, error = %e, "audit failed");
                return;
            }
        };

        if !record.passes() {
            warn!(
                conversation_id = %job.conversation_id,
                correction = %record.correction,
                "answer failed audit"
            );
        }

        let entry = AuditEntry::new(job.conversation_id, job.label, record);
        if let Err(e) = self.sink.record(&entry).await {
            warn!(conversation_id = %job.conversation_id, error = %e, "failed to record audit");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{MockAI, RecordingAuditSink};
    use serde_json::json;
    use std::time::Duration;

    fn job() -> AuditJob {
        AuditJob {
            conversation_id: ConversationId::new(),
            label: ClassificationLabel::Simples,
            question: "Qual o teto do MEI?".into(),
            answer: "**R$ 81.000,00**".into(),
            history: vec![],
        }
    }

    #[tokio::test]
    async fn records_scored_jobs_and_stops_when_dispatchers_drop() {
        let ai = Arc::new(MockAI::new().with_json_response(&json!({
            "nota_fundamentacao": 3,
            "nota_utilidade": 5,
            "nota_protocolo_visual": 5,
            "nota_tom_de_voz": 5,
            "aprovado": false,
            "correcao_necessaria": "Cite a LC 123/2006"
        })));
        let sink = Arc::new(RecordingAuditSink::new());
        let judge = Arc::new(Judge::new(ai, "m", Duration::from_secs(5)));

        let (dispatcher, handle) = AuditWorker::spawn(judge, sink.clone(), CancellationToken::new());
        let job = job();
        let conversation_id = job.conversation_id;
        dispatcher.dispatch(job);
        drop(dispatcher);
        handle.await.unwrap();

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].conversation_id, conversation_id);
        assert!(!entries[0].record.approved);
        assert_eq!(entries[0].record.correction, "Cite a LC 123/2006");
    }

    #[tokio::test]
    async fn judge_failures_are_swallowed() {
        let sink = Arc::new(RecordingAuditSink::new());
        let judge = Arc::new(Judge::new(Arc::new(MockAI::failing()), "m", Duration::from_secs(5)));

        let (dispatcher, handle) = AuditWorker::spawn(judge, sink.clone(), CancellationToken::new());
        dispatcher.dispatch(job());
        drop(dispatcher);
        handle.await.unwrap();

        assert!(sink.entries().is_empty());
    }

    #[tokio::test]
    async fn shutdown_abandons_in_flight_audit() {
        let sink = Arc::new(RecordingAuditSink::new());
        let judge = Arc::new(Judge::new(Arc::new(MockAI::hanging()), "m", Duration::from_secs(600)));
        let shutdown = CancellationToken::new();

        let (dispatcher, handle) = AuditWorker::spawn(judge, sink.clone(), shutdown.clone());
        dispatcher.dispatch(job());
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn dispatch_after_worker_gone_does_not_panic() {
        let (dispatcher, rx) = AuditDispatcher::channel();
        drop(rx);
        dispatcher.dispatch(job());
    }

    #[tokio::test]
    async fn full_queue_drops_jobs_without_blocking() {
        let (dispatcher, mut rx) = AuditDispatcher::with_capacity(2);
        let jobs: Vec<AuditJob> = (0..5).map(|_| job()).collect();
        let kept: Vec<ConversationId> = jobs.iter().take(2).map(|j| j.conversation_id).collect();

        tokio::time::timeout(Duration::from_millis(100), async {
            for job in jobs {
                dispatcher.dispatch(job);
            }
        })
        .await
        .expect("dispatch blocked on a full queue");

        drop(dispatcher);
        let mut received = Vec::new();
        while let Some(job) = rx.recv().await {
            received.push(job.conversation_id);
        }
        assert_eq!(received, kept);
    }
}
