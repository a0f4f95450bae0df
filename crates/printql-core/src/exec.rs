//! Programs run by `exec` steps.
//!
//! Programs are registered by name before a selection is built. A name that
//! is not registered fails the build; a program that fails on one value only
//! turns that value into null.

use printql_proto::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure of a single program invocation.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ExecError(pub String);

impl ExecError {
    /// Create an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A program transforming the value preceding an `exec` step.
pub trait ExecProgram: Send + Sync {
    /// Compute the output for one input value.
    fn execute(&self, input: &Value, params: &[String]) -> Result<Value, ExecError>;
}

impl<F> ExecProgram for F
where
    F: Fn(&Value, &[String]) -> Result<Value, ExecError> + Send + Sync,
{
    fn execute(&self, input: &Value, params: &[String]) -> Result<Value, ExecError> {
        self(input, params)
    }
}

/// Named programs available to `exec` steps.
#[derive(Clone, Default)]
pub struct ProgramRegistry {
    programs: HashMap<String, Arc<dyn ExecProgram>>,
}

impl ProgramRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program under a name, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, program: impl ExecProgram + 'static) {
        self.programs.insert(name.into(), Arc::new(program));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_program(mut self, name: impl Into<String>, program: impl ExecProgram + 'static) -> Self {
        self.register(name, program);
        self
    }

    /// Look up a program.
    pub fn get(&self, name: &str) -> Option<ProgramRef> {
        self.programs.get(name).map(|program| ProgramRef {
            name: name.to_string(),
            program: Arc::clone(program),
        })
    }

    /// Number of registered programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Check if no program is registered.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl fmt::Debug for ProgramRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.programs.keys().collect();
        names.sort();
        f.debug_struct("ProgramRegistry")
            .field("programs", &names)
            .finish()
    }
}

/// A resolved program held by an `exec` element.
#[derive(Clone)]
pub struct ProgramRef {
    name: String,
    program: Arc<dyn ExecProgram>,
}

impl ProgramRef {
    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the program.
    pub fn execute(&self, input: &Value, params: &[String]) -> Result<Value, ExecError> {
        self.program.execute(input, params)
    }
}

impl fmt::Debug for ProgramRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProgramRef").field(&self.name).finish()
    }
}
