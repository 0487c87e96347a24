//! Rhai Script Engine Implementation
//!
//! Filter scripts see two variables:
//! - `row` - the row record as an object map
//! - `params` - the parameters attached to the condition
//!
//! A script either evaluates to a boolean directly or defines
//! `fn matches(row, params)`, which is preferred when present.
//!
//! ## Helper Functions
//!
//! - `like(filter, value)` - case-insensitive substring match
//! - `in_list(list, value)` - loose membership
//! - `loose_eq(a, b)` - loose equality

use crate::error::{GridError, Result, ResultExt};
use crate::filter::{operator, CustomFilter};
use crate::scripting::{CompiledFilterScript, SharedScriptCache};
use rhai::{Dynamic, Engine, Scope, AST};
use serde_json::Value;
use std::sync::{Arc, RwLock};

/// Entry point name looked up in scripts that define functions.
pub const MATCH_FN: &str = "matches";

/// Script engine that turns Rhai sources into row predicates
pub struct ScriptEngine {
    /// The Rhai engine instance, shared with compiled filters
    engine: Arc<Engine>,
    /// Cache of compiled scripts
    cache: SharedScriptCache,
}

impl ScriptEngine {
    /// Create a new script engine with default configuration
    pub fn new() -> Self {
        Self::with_cache(Arc::new(RwLock::new(super::ScriptCache::new())))
    }

    /// Create a new script engine with a shared cache
    pub fn with_cache(cache: SharedScriptCache) -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine);

        Self {
            engine: Arc::new(engine),
            cache,
        }
    }

    /// Configure the Rhai engine with helper functions and safety limits
    fn configure_engine(engine: &mut Engine) {
        // Set safety limits
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(32);
        engine.set_max_operations(10_000);
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(1_000);
        engine.set_max_map_size(1_000);

        engine.register_fn("like", |filter: Dynamic, value: Dynamic| -> bool {
            operator::like(&to_json(&filter), &to_json(&value))
        });
        engine.register_fn("in_list", |list: Dynamic, value: Dynamic| -> bool {
            operator::in_list(&to_json(&list), &to_json(&value))
        });
        engine.register_fn("loose_eq", |a: Dynamic, b: Dynamic| -> bool {
            operator::loose_eq(&to_json(&a), &to_json(&b))
        });
    }

    /// Compile a script and cache it
    pub fn compile(&self, name: &str, source: &str) -> Result<CompiledFilterScript> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| GridError::Script(format!("Failed to acquire cache lock: {}", e)))?;

        cache.get_or_compile(&self.engine, name, source)
    }

    /// Evaluate a compiled script against one row
    pub fn execute(&self, script: &CompiledFilterScript, row: &Value, params: &Value) -> Result<bool> {
        run_script(&self.engine, &script.ast, row, params)
    }

    /// Compile and evaluate a script in one step
    pub fn eval(&self, source: &str, row: &Value, params: &Value) -> Result<bool> {
        let script = self.compile("temp", source)?;
        self.execute(&script, row, params)
    }

    /// Compile a script into a custom filter condition.
    ///
    /// Runtime errors inside the script are logged and count as a non-match.
    pub fn compile_filter(&self, name: &str, source: &str) -> Result<CustomFilter> {
        let script = self.compile(name, source)?;
        let engine = self.engine.clone();
        let label = script.name().to_string();
        let ast = script.ast;
        Ok(CustomFilter::new(script.name, move |row, params| {
            match run_script(&engine, &ast, row, params) {
                Ok(matched) => matched,
                Err(e) => {
                    tracing::warn!("Filter script '{}' failed: {}", label, e);
                    false
                }
            }
        }))
    }

    /// Validate a script without executing it
    pub fn validate(&self, source: &str) -> Result<()> {
        self.engine
            .compile(source)
            .map(|_| ())
            .map_err(|e| GridError::Script(format!("Validation error: {}", e)))
    }

    /// Clear the script cache
    pub fn clear_cache(&self) -> Result<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| GridError::Script(format!("Failed to acquire cache lock: {}", e)))?;
        cache.clear();
        Ok(())
    }

    /// Get a reference to the shared cache
    pub fn cache(&self) -> &SharedScriptCache {
        &self.cache
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("cache_size", &self.cache.read().map(|c| c.len()).ok())
            .finish()
    }
}

fn to_json(value: &Dynamic) -> Value {
    rhai::serde::from_dynamic(value).unwrap_or(Value::Null)
}

fn run_script(engine: &Engine, ast: &AST, row: &Value, params: &Value) -> Result<bool> {
    let row = rhai::serde::to_dynamic(row).context("Failed to convert row")?;
    let params = rhai::serde::to_dynamic(params).context("Failed to convert params")?;

    let mut scope = Scope::new();
    scope.push_dynamic("row", row.clone());
    scope.push_dynamic("params", params.clone());

    let has_entry = ast.iter_functions().any(|f| f.name == MATCH_FN && f.params.len() == 2);
    let result = if has_entry {
        engine.call_fn::<Dynamic>(&mut scope, ast, MATCH_FN, (row, params))
    } else {
        engine.eval_ast_with_scope::<Dynamic>(&mut scope, ast)
    }
    .map_err(|e| GridError::Script(format!("Execution error: {}", e)))?;

    result
        .as_bool()
        .map_err(|actual| GridError::Script(format!("Script must return a boolean, got {}", actual)))
}
