// file: src/pipeline/context.rs
// description: deadline and cancellation guard for collaborator calls
// reference: https://docs.rs/tokio-util/latest/tokio_util/sync/struct.CancellationToken.html

use crate::error::{AnalysisError, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Carried into every step of one run.
#[derive(Debug, Clone)]
pub struct StepContext {
    cancel: CancellationToken,
    timeout: Duration,
}

impl StepContext {
    pub fn new(cancel: CancellationToken, timeout: Duration) -> Self {
        Self { cancel, timeout }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `fut` until it finishes, the deadline passes, or the run is
    /// cancelled, whichever comes first.
    pub async fn guard<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AnalysisError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, fut) => match outcome {
                Ok(result) => result,
                Err(_) => Err(AnalysisError::Timeout {
                    operation: operation.to_string(),
                    after: self.timeout,
                }),
            },
        }
    }
}
