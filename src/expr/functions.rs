//! Expression Functions Module
//!
//! The explicit function whitelist available to embedded expressions.
//! Nothing outside this table is reachable from request values.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;

/// Wall-clock rendering for instant values (UTC).
pub const INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// == Value ==
/// A value produced during expression evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A point in time; the only kind that supports duration arithmetic
    Instant(DateTime<Utc>),
    /// Plain text; rendered verbatim
    Text(String),
}

impl Value {
    /// Renders the value as the string substituted back into the request.
    pub fn render(&self) -> String {
        match self {
            Value::Instant(instant) => instant.format(INSTANT_FORMAT).to_string(),
            Value::Text(text) => text.clone(),
        }
    }
}

// == Expression Function ==
/// A whitelisted, zero-argument expression function.
///
/// Implementations must be stateless with respect to evaluation: `call` may
/// be invoked concurrently from many requests.
pub trait ExprFunction: Send + Sync {
    /// Name the function is invoked by inside expressions.
    fn name(&self) -> &str;

    /// Evaluates the function.
    fn call(&self) -> Result<Value>;
}

// == Now Function ==
/// The builtin `now` function: current UTC instant.
pub struct NowFunction;

impl ExprFunction for NowFunction {
    fn name(&self) -> &str {
        "now"
    }

    fn call(&self) -> Result<Value> {
        Ok(Value::Instant(Utc::now()))
    }
}

// == Function Table ==
/// Explicit whitelist of functions available to embedded expressions.
///
/// Built once at construction time and passed down to the evaluator;
/// immutable during evaluation, so the whitelist stays inspectable and
/// cannot grow behind a request's back.
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<String, Arc<dyn ExprFunction>>,
}

impl FunctionTable {
    // == Constructors ==
    /// Creates an empty table (no functions whitelisted).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with the builtin whitelist: `now`.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table.register(Arc::new(NowFunction));
        table
    }

    // == Registration ==
    /// Registers a function under its own name, replacing any previous
    /// entry with the same name.
    pub fn register(&mut self, function: Arc<dyn ExprFunction>) {
        self.functions.insert(function.name().to_string(), function);
    }

    // == Lookup ==
    /// Looks up a function by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ExprFunction>> {
        self.functions.get(name)
    }

    /// Registered function names, sorted for stable output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if no functions are registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
