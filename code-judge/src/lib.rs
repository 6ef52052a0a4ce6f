//! # Code Judge
//!
//! Runs untrusted source code against a list of test cases. Each test case
//! gets its own interpreter process with a wall-clock budget; captured output
//! is bounded, normalized and compared with the expected output.

mod error;
mod evaluator;
mod languages;
mod output;
mod runner;
mod service;
mod types;

#[cfg(test)]
mod tests;

pub use error::Error;
pub use evaluator::{
    judge, Evaluator, RUNNER_ERROR_PREFIX, TIME_LIMIT_EXCEEDED, UNSUPPORTED_LANGUAGE,
};
pub use languages::{
    Invocation, JavaScriptRuntime, LanguageRegistry, LanguageRuntime, PythonRuntime,
};
pub use output::{capture_limit_for, clamp, normalize, TRUNCATION_MARKER};
pub use runner::{DirectExecutor, Executor};
pub use service::JudgeService;
pub use types::{
    EvaluationReport, ExecutionRequest, Language, ProcessOutcome, TestCase, TestVerdict,
};

/// Result type for code judge operations
pub type Result<T> = std::result::Result<T, Error>;
