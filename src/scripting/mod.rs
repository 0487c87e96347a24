//! Rhai Scripting Engine for Filter Conditions
//!
//! Scripts are the serializable counterpart of custom filter functions: a
//! configuration file can carry a Rhai expression where code would pass a
//! closure. A compiled script becomes an ordinary
//! [`CustomFilter`](crate::filter::CustomFilter) and is stored, evaluated
//! and reported like any other function condition.
//!
//! ## Example Scripts
//!
//! Rows older than a threshold:
//! ```rhai
//! row.age >= params.min_age
//! ```
//!
//! Tag membership:
//! ```rhai
//! fn matches(row, params) {
//!     row.tags.contains(params.tag)
//! }
//! ```
//!
//! Case-insensitive search across two fields:
//! ```rhai
//! like(params.q, row.first) || like(params.q, row.last)
//! ```

mod engine;

pub use engine::{ScriptEngine, MATCH_FN};

use crate::error::{GridError, Result};
use rhai::{Engine, AST};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A compiled filter script
#[derive(Clone)]
pub struct CompiledFilterScript {
    /// The compiled AST
    ast: AST,
    /// The original source code
    source: String,
    /// Name/identifier for this script
    name: String,
}

impl CompiledFilterScript {
    /// Get the source code of this script
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the name of this script
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for CompiledFilterScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledFilterScript")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// Cache for compiled scripts to avoid recompilation
#[derive(Default)]
pub struct ScriptCache {
    /// Map from script source to compiled script
    cache: HashMap<String, CompiledFilterScript>,
}

impl ScriptCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Get a cached script or compile and cache it
    pub fn get_or_compile(
        &mut self,
        engine: &Engine,
        name: &str,
        source: &str,
    ) -> Result<CompiledFilterScript> {
        if let Some(script) = self.cache.get(source) {
            return Ok(script.clone());
        }

        let ast = engine
            .compile(source)
            .map_err(|e| GridError::Script(format!("Compilation error: {}", e)))?;

        let script = CompiledFilterScript {
            ast,
            source: source.to_string(),
            name: name.to_string(),
        };

        self.cache.insert(source.to_string(), script.clone());
        Ok(script)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Remove a specific script from the cache
    pub fn invalidate(&mut self, source: &str) {
        self.cache.remove(source);
    }
}

/// Thread-safe script cache wrapper
pub type SharedScriptCache = Arc<RwLock<ScriptCache>>;

/// Create a new shared script cache
pub fn create_shared_cache() -> SharedScriptCache {
    Arc::new(RwLock::new(ScriptCache::new()))
}
