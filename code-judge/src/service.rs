use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::{
    error::Error,
    evaluator::Evaluator,
    languages::LanguageRegistry,
    runner::Executor,
    types::{EvaluationReport, ExecutionRequest},
};

/// Evaluator behind a cap on how many evaluations run at once.
#[derive(Clone)]
pub struct JudgeService {
    evaluator: Evaluator,
    semaphore: Arc<Semaphore>,
}

impl JudgeService {
    pub fn new(
        executor: impl Executor + 'static,
        languages: LanguageRegistry,
        max_concurrent_evaluations: usize,
    ) -> Self {
        Self {
            evaluator: Evaluator::new(executor, languages),
            semaphore: Arc::new(Semaphore::new(max_concurrent_evaluations)),
        }
    }

    pub fn languages(&self) -> &LanguageRegistry {
        self.evaluator.languages()
    }

    /// Waits for a free slot, then evaluates. Only fails if the service has
    /// been shut down.
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<EvaluationReport, Error> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| {
                Error::Unavailable(format!("Failed to acquire evaluation permit: {}", e))
            })?;

        debug!(
            language = %request.language,
            available_slots = self.semaphore.available_permits(),
            "Evaluation slot acquired"
        );

        Ok(self.evaluator.evaluate(request).await)
    }

    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Rejects every waiting and future [`execute`](Self::execute) call.
    pub fn shutdown(&self) {
        self.semaphore.close();
    }
}
