/// Settings resolved once at start-up and handed to the router.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Per-test wall-clock budget
    pub timeout_ms: u64,
    /// Cap on captured stdout and stderr, in characters
    pub max_output_chars: usize,
    /// Shared secret expected in `X-RUNNER-SECRET`
    pub runner_secret: Option<String>,
    /// Evaluations allowed to run at the same time
    pub max_concurrent: usize,
    /// Extra CORS origin patterns (regular expressions)
    pub allowed_origins: Vec<String>,
    pub python_bin: Option<String>,
    pub node_bin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            max_output_chars: 20000,
            runner_secret: None,
            max_concurrent: 8,
            allowed_origins: Vec::new(),
            python_bin: None,
            node_bin: None,
        }
    }
}

/// The per-request limits the core receives as plain parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub timeout_ms: u64,
    pub max_output_chars: usize,
}

impl From<&ServerConfig> for RunLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            max_output_chars: config.max_output_chars,
        }
    }
}
