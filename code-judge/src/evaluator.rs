use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::Error,
    languages::{Invocation, LanguageRegistry},
    output::{clamp, normalize},
    runner::Executor,
    types::{EvaluationReport, ExecutionRequest, ProcessOutcome, TestCase, TestVerdict},
};

pub const UNSUPPORTED_LANGUAGE: &str = "Unsupported language";
pub const TIME_LIMIT_EXCEEDED: &str = "Time limit exceeded";
/// Prefix of the error recorded for a test case the harness itself failed to run
pub const RUNNER_ERROR_PREFIX: &str = "Runner error: ";

/// Runs a program against its test cases, one at a time, in order.
#[derive(Clone)]
pub struct Evaluator {
    executor: Arc<dyn Executor>,
    languages: Arc<LanguageRegistry>,
}

impl Evaluator {
    pub fn new(executor: impl Executor + 'static, languages: LanguageRegistry) -> Self {
        Self {
            executor: Arc::new(executor),
            languages: Arc::new(languages),
        }
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    /// Never fails: unsupported languages and per-test harness errors are
    /// reported inside the returned [`EvaluationReport`].
    #[instrument(
        skip_all,
        fields(
            evaluation_id = %Uuid::new_v4(),
            language = %request.language,
            test_cases = request.testcases.len(),
        )
    )]
    pub async fn evaluate(&self, request: &ExecutionRequest) -> EvaluationReport {
        let Some(invocation) = self
            .languages
            .resolve(&request.language, &request.source_code)
        else {
            warn!("Rejecting evaluation for unsupported language");
            return EvaluationReport::failed(UNSUPPORTED_LANGUAGE);
        };

        let timeout = Duration::from_millis(request.timeout_ms);
        let mut results = Vec::with_capacity(request.testcases.len());

        for (index, case) in request.testcases.iter().enumerate() {
            debug!(test_index = index, "Running test case");
            let started = Instant::now();

            let verdict = match self
                .run_case(&invocation, case, timeout, request.max_output_chars)
                .await
            {
                Ok(verdict) => verdict,
                Err(e) => {
                    error!(test_index = index, error = %e, "Test case could not be executed");
                    TestVerdict {
                        passed: false,
                        actual_output: String::new(),
                        error: format!("{}{}", RUNNER_ERROR_PREFIX, e),
                        runtime_ms: started.elapsed().as_millis() as u64,
                    }
                }
            };

            debug!(
                test_index = index,
                passed = verdict.passed,
                runtime_ms = verdict.runtime_ms,
                "Test case resolved"
            );
            results.push(verdict);
        }

        let report = EvaluationReport::completed(results);
        info!(
            passed = report.passed_count(),
            total = request.testcases.len(),
            "Evaluation completed"
        );
        report
    }

    async fn run_case(
        &self,
        invocation: &Invocation,
        case: &TestCase,
        timeout: Duration,
        max_output_chars: usize,
    ) -> Result<TestVerdict, Error> {
        let input = case.input.as_deref().unwrap_or_default();
        let outcome = self.executor.run(invocation, input, timeout).await?;
        if outcome.was_killed {
            warn!(runtime_ms = outcome.runtime_ms, "Test case exceeded time limit");
        }
        Ok(judge(&case.output, &outcome, max_output_chars))
    }
}

/// Turns one process outcome into a verdict against the expected output.
pub fn judge(expected: &str, outcome: &ProcessOutcome, max_output_chars: usize) -> TestVerdict {
    let expected = normalize(Some(expected));
    let actual = normalize(Some(&clamp(&outcome.stdout, max_output_chars)));

    let error = if outcome.was_killed {
        TIME_LIMIT_EXCEEDED.to_string()
    } else {
        clamp(&outcome.stderr, max_output_chars)
    };

    TestVerdict {
        passed: outcome.succeeded() && actual == expected,
        actual_output: actual,
        error,
        runtime_ms: outcome.runtime_ms,
    }
}
