//! Expression Module
//!
//! Evaluates the restricted expression language embedded in request values.
//! A value wrapped in `{…}` is compiled and evaluated against an explicit
//! function whitelist at request time; everything else passes through
//! untouched. Expressions never reach the host environment; the whitelist
//! is the entire surface.

mod functions;
mod parser;

pub use functions::{ExprFunction, FunctionTable, NowFunction, Value, INSTANT_FORMAT};

use crate::error::{ProviderError, Result};

// == Evaluator ==
/// Resolves embedded expressions in request values.
///
/// The function table is fixed at construction, which keeps the whitelist
/// inspectable and the evaluator safe to share across concurrent requests
/// (evaluation holds no mutable state).
pub struct Evaluator {
    functions: FunctionTable,
}

impl Evaluator {
    // == Constructors ==
    /// Creates an evaluator over an explicit function table.
    pub fn new(functions: FunctionTable) -> Self {
        Self { functions }
    }

    /// Creates an evaluator with the builtin whitelist (`now`).
    pub fn with_builtins() -> Self {
        Self::new(FunctionTable::with_builtins())
    }

    /// The function whitelist this evaluator resolves against.
    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    // == Resolve ==
    /// Resolves one request value.
    ///
    /// Values not wrapped in `{…}` are returned unchanged without any parse
    /// attempt. Wrapped values are evaluated and replaced by the rendered
    /// result; any compilation or evaluation failure aborts with an
    /// expression error rather than leaking the raw text into filter
    /// semantics.
    pub fn resolve(&self, value: &str) -> Result<String> {
        if value.len() < 2 || !value.starts_with('{') || !value.ends_with('}') {
            return Ok(value.to_string());
        }

        let inner = value[1..value.len() - 1].trim();
        if inner.is_empty() {
            return Err(ProviderError::Expression(format!(
                "empty expression '{}'",
                value
            )));
        }

        parser::evaluate(inner, &self.functions)
            .map(|resolved| resolved.render())
            .map_err(|err| match err {
                ProviderError::Expression(reason) => {
                    ProviderError::Expression(format!("{} in '{}'", reason, value))
                }
                other => other,
            })
    }
}
