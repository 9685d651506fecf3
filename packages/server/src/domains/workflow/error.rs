use std::time::Duration;

use thiserror::Error;

use super::prompts::{MODEL_FAILURE_RESPONSE, TIMEOUT_RESPONSE};

/// Turn stage, for logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classifier,
    Specialist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Classifier => write!(f, "classifier"),
            Stage::Specialist => write!(f, "specialist"),
        }
    }
}

/// Why a turn produced no answer. Each variant leaves history untouched.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{stage} model call timed out after {}s", .after.as_secs())]
    Timeout { stage: Stage, after: Duration },

    #[error("{stage} model call failed: {source}")]
    Model {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to persist conversation: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl WorkflowError {
    /// Text safe to show the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            WorkflowError::Timeout { .. } => TIMEOUT_RESPONSE,
            WorkflowError::Model { .. } | WorkflowError::Persistence(_) => MODEL_FAILURE_RESPONSE,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WorkflowError::Timeout { .. })
    }
}

/// Run a model future under the turn's timeout, tagging failures by stage.
pub(crate) async fn with_timeout<T, F>(stage: Stage, after: Duration, fut: F) -> Result<T, WorkflowError>
where
    F: std::future::Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(WorkflowError::Model { stage, source }),
        Err(_) => Err(WorkflowError::Timeout { stage, after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_is_distinct_from_failure() {
        let slow = with_timeout(Stage::Specialist, Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            anyhow::Ok(())
        })
        .await
        .unwrap_err();
        assert!(slow.is_timeout());
        assert_eq!(slow.user_message(), TIMEOUT_RESPONSE);

        let broken = with_timeout(Stage::Classifier, Duration::from_secs(1), async {
            Err::<(), _>(anyhow::anyhow!("503"))
        })
        .await
        .unwrap_err();
        assert!(!broken.is_timeout());
        assert_eq!(broken.user_message(), MODEL_FAILURE_RESPONSE);
        assert!(broken.to_string().starts_with("classifier model call failed"));
    }
}
