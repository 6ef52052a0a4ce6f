use crate::{languages::LanguageRuntime, types::Language};

pub struct JavaScriptRuntime {
    node: String,
}

impl JavaScriptRuntime {
    pub fn new(node: Option<String>) -> Self {
        Self {
            node: node.unwrap_or_else(|| "node".to_string()),
        }
    }
}

impl LanguageRuntime for JavaScriptRuntime {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn run_command(&self) -> &str {
        &self.node
    }

    // `-e` evaluates the script with stdin still attached to the program
    fn run_args(&self, source: &str) -> Vec<String> {
        vec!["-e".to_string(), source.to_string()]
    }
}
