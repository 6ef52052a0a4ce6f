//! Language-specific interpreter invocations

mod javascript;
mod python;

pub use javascript::JavaScriptRuntime;
pub use python::PythonRuntime;

use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;
use which::which;

use crate::{error::Error, types::Language};

/// A concrete command line ready to hand to an [`Executor`](crate::Executor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The program text is the last argument and can be huge
        write!(f, "{} ({} args)", self.command, self.args.len())
    }
}

/// How one language runs inline source text.
pub trait LanguageRuntime: Send + Sync {
    fn language(&self) -> Language;

    /// Interpreter executable
    fn run_command(&self) -> &str;

    /// Arguments that make the interpreter execute `source` directly,
    /// leaving stdin and stdout to the program.
    fn run_args(&self, source: &str) -> Vec<String>;

    fn required_tools(&self) -> Vec<&str> {
        vec![self.run_command()]
    }

    fn check_tools(&self) -> Result<(), Error> {
        let missing: Vec<_> = self
            .required_tools()
            .iter()
            .filter(|tool| which(tool).is_err())
            .map(|s| (*s).to_string())
            .collect();

        if !missing.is_empty() {
            return Err(Error::Process(format!(
                "Missing required tools: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

/// Registry of the closed set of supported languages.
pub struct LanguageRegistry {
    runtimes: BTreeMap<&'static str, Box<dyn LanguageRuntime>>,
}

impl LanguageRegistry {
    pub fn empty() -> Self {
        Self {
            runtimes: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) the runtime for its language.
    pub fn with_runtime(mut self, runtime: impl LanguageRuntime + 'static) -> Self {
        self.runtimes
            .insert(runtime.language().as_str(), Box::new(runtime));
        self
    }

    /// Python and JavaScript with explicit interpreter overrides.
    pub fn with_interpreters(python: Option<String>, node: Option<String>) -> Self {
        Self::empty()
            .with_runtime(PythonRuntime::new(python))
            .with_runtime(JavaScriptRuntime::new(node))
    }

    pub fn supports(&self, language: &str) -> bool {
        self.runtime(language).is_some()
    }

    pub fn languages(&self) -> Vec<&'static str> {
        self.runtimes.keys().copied().collect()
    }

    /// Maps an identifier plus source text to an interpreter invocation.
    /// `None` for anything outside the supported set.
    pub fn resolve(&self, language: &str, source: &str) -> Option<Invocation> {
        self.runtime(language)
            .map(|runtime| Invocation::new(runtime.run_command(), runtime.run_args(source)))
    }

    fn runtime(&self, identifier: &str) -> Option<&dyn LanguageRuntime> {
        let language = identifier.parse::<Language>().ok()?;
        self.runtimes.get(language.as_str()).map(|runtime| &**runtime)
    }

    /// Languages whose interpreter could not be found on `PATH`.
    pub fn unavailable(&self) -> Vec<&'static str> {
        self.runtimes
            .iter()
            .filter_map(|(name, runtime)| match runtime.check_tools() {
                Ok(()) => None,
                Err(e) => {
                    warn!(language = %runtime.language(), error = %e, "Interpreter unavailable");
                    Some(*name)
                }
            })
            .collect()
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::with_interpreters(None, None)
    }
}

impl fmt::Debug for LanguageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn skip_if_not_available(tools: &[&str]) -> bool {
    let missing: Vec<_> = tools
        .iter()
        .filter(|tool| which(tool).is_err())
        .map(|s| (*s).to_string())
        .collect();

    if !missing.is_empty() {
        eprintln!("Skipping test: {} not available", missing.join(", "));
        return true;
    }
    false
}
