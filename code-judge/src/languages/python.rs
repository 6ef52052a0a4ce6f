use crate::{languages::LanguageRuntime, types::Language};

pub struct PythonRuntime {
    interpreter: String,
}

impl PythonRuntime {
    pub fn new(interpreter: Option<String>) -> Self {
        Self {
            interpreter: interpreter.unwrap_or_else(|| "python3".to_string()),
        }
    }
}

impl LanguageRuntime for PythonRuntime {
    fn language(&self) -> Language {
        Language::Python
    }

    fn run_command(&self) -> &str {
        &self.interpreter
    }

    fn run_args(&self, source: &str) -> Vec<String> {
        vec!["-c".to_string(), source.to_string()]
    }
}
