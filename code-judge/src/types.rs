use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "python" => Ok(Language::Python),
            "javascript" => Ok(Language::JavaScript),
            _ => Err(Error::UnsupportedLanguage(s.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A judged submission: one program, many test cases.
///
/// `language` stays a raw identifier so an unknown one can be reported as a
/// whole-request failure instead of a deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub language: String,
    pub source_code: String,
    pub testcases: Vec<TestCase>,
    /// Wall-clock budget per test case
    pub timeout_ms: u64,
    /// Cap applied separately to captured stdout and stderr
    pub max_output_chars: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default, deserialize_with = "text::optional")]
    pub input: Option<String>,
    /// Expected output
    #[serde(default, deserialize_with = "text::required")]
    pub output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            output: output.into(),
        }
    }
}

/// What one interpreter invocation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub runtime_ms: u64,
    pub was_killed: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn succeeded(&self) -> bool {
        !self.was_killed && self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestVerdict {
    pub passed: bool,
    pub actual_output: String,
    pub error: String,
    pub runtime_ms: u64,
}

/// Serialized as `{ok: true, results: [...]}` or `{ok: false, error: "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<TestVerdict>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationReport {
    pub fn completed(results: Vec<TestVerdict>) -> Self {
        Self {
            ok: true,
            results: Some(results),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            results: None,
            error: Some(error.into()),
        }
    }

    pub fn results(&self) -> &[TestVerdict] {
        self.results.as_deref().unwrap_or_default()
    }

    pub fn passed_count(&self) -> usize {
        self.results().iter().filter(|r| r.passed).count()
    }
}

/// Test case text fields arrive from loosely typed clients; any JSON value is
/// accepted and rendered the way JavaScript's `String(value)` would render it.
mod text {
    use serde::{Deserialize, Deserializer};
    use serde_json::{Number, Value};

    fn stringify(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            other => Some(render(&other)),
        }
    }

    fn render(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number(n),
            // arrays join their elements with commas, nulls become empty
            Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join(","),
            Value::Object(_) => "[object Object]".to_string(),
        }
    }

    fn number(n: &Number) -> String {
        if n.is_i64() || n.is_u64() {
            return n.to_string();
        }
        match n.as_f64() {
            // `Display` drops a zero fraction (`1.0` prints as `1`)
            Some(f) if f == 0.0 => "0".to_string(),
            Some(f) => f.to_string(),
            None => n.to_string(),
        }
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(stringify(Value::deserialize(deserializer)?))
    }

    pub fn required<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(stringify(Value::deserialize(deserializer)?).unwrap_or_default())
    }
}
