//! In-process test harness.
//!
//! Wires the real orchestrator, audit worker and router on top of the mocks
//! from `TestDependencies`. No network, no database.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use juridico_core::domains::audit::{AuditEntry, AuditWorker, Judge};
use juridico_core::domains::workflow::{Orchestrator, WorkflowSettings};
use juridico_core::kernel::TestDependencies;
use juridico_core::server::{build_app, AxumAppState};
use tokio_util::sync::CancellationToken;

pub struct TestHarness {
    pub deps: TestDependencies,
    pub state: AxumAppState,
    shutdown: CancellationToken,
}

impl TestHarness {
    pub async fn new(deps: TestDependencies) -> Self {
        Self::with_settings(deps, fast_settings()).await
    }

    pub async fn with_settings(deps: TestDependencies, settings: WorkflowSettings) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let server_deps = deps.into_deps();
        let shutdown = CancellationToken::new();
        let judge = Arc::new(Judge::new(
            server_deps.ai.clone(),
            settings.audit_model.clone(),
            settings.model_timeout,
        ));
        let (dispatcher, _handle) =
            AuditWorker::spawn(judge.clone(), server_deps.audit_sink.clone(), shutdown.clone());
        let orchestrator = Orchestrator::initialize(&server_deps, settings, judge, dispatcher).await;

        Self {
            deps,
            state: AxumAppState::new(orchestrator, server_deps),
            shutdown,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.state.orchestrator
    }

    pub fn app(&self) -> Router {
        build_app(self.state.clone(), &[], Duration::from_secs(10))
    }

    /// Wait until the background worker has recorded `count` audits.
    pub async fn wait_for_audits(&self, count: usize) -> Vec<AuditEntry> {
        for _ in 0..200 {
            let entries = self.deps.audit_sink.entries();
            if entries.len() >= count {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.deps.audit_sink.entries()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub fn fast_settings() -> WorkflowSettings {
    WorkflowSettings {
        model_timeout: Duration::from_secs(2),
        ..WorkflowSettings::default()
    }
}
