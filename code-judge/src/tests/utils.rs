pub mod defaults {
    use crate::{ExecutionRequest, TestCase};

    pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
    pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 20000;

    pub fn request(language: &str, source: &str, testcases: Vec<TestCase>) -> ExecutionRequest {
        ExecutionRequest {
            language: language.to_string(),
            source_code: source.to_string(),
            testcases,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_output_chars: DEFAULT_MAX_OUTPUT_CHARS,
        }
    }
}

pub mod outcomes {
    use crate::ProcessOutcome;

    pub fn exited(code: i32, stdout: &str, stderr: &str) -> ProcessOutcome {
        ProcessOutcome {
            exit_code: Some(code),
            runtime_ms: 12,
            was_killed: false,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    pub fn success(stdout: &str) -> ProcessOutcome {
        exited(0, stdout, "")
    }

    pub fn killed(stdout: &str, stderr: &str, runtime_ms: u64) -> ProcessOutcome {
        ProcessOutcome {
            exit_code: None,
            runtime_ms,
            was_killed: true,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }
}
