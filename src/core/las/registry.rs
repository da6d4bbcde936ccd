//! Name → evaluator map
//!
//! Names are case-insensitive. The first registration of a name wins;
//! later ones fail with `DuplicateEvaluator`.

use super::builtin;
use super::Evaluator;
use crate::error::{PolicyError, Result};
use ahash::RandomState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct EvaluatorRegistry {
    evaluators: RwLock<HashMap<String, Arc<dyn Evaluator>, RandomState>>,
}

impl EvaluatorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        EvaluatorRegistry {
            evaluators: RwLock::new(HashMap::default()),
        }
    }

    /// Registry holding every built-in evaluator
    pub fn with_builtins() -> Self {
        Self::with_builtins_except(&[])
    }

    /// Registry holding the built-ins not named in `disabled`
    pub fn with_builtins_except(disabled: &[String]) -> Self {
        let registry = Self::new();
        for (name, evaluator) in builtin::all() {
            if disabled.iter().any(|d| d.eq_ignore_ascii_case(name)) {
                debug!("Built-in evaluator '{}' disabled", name);
                continue;
            }
            // Built-in names are distinct
            let _ = registry.register_arc(name, evaluator);
        }
        registry
    }

    /// Register an evaluator under `name`
    pub fn register<E: Evaluator + 'static>(&self, name: &str, evaluator: E) -> Result<()> {
        self.register_arc(name, Arc::new(evaluator))
    }

    pub fn register_arc(&self, name: &str, evaluator: Arc<dyn Evaluator>) -> Result<()> {
        let key = normalize(name)?;
        let mut evaluators = self.evaluators.write();
        if evaluators.contains_key(&key) {
            return Err(PolicyError::DuplicateEvaluator(key));
        }
        debug!("Registered evaluator '{}'", key);
        evaluators.insert(key, evaluator);
        Ok(())
    }

    /// Look up the evaluator bound to `name`
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Evaluator>> {
        self.evaluators
            .read()
            .get(&name.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| PolicyError::UnknownEvaluator(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.evaluators
            .read()
            .contains_key(&name.trim().to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.evaluators.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.read().is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.evaluators.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("names", &self.names())
            .finish()
    }
}

fn normalize(name: &str) -> Result<String> {
    let key = name.trim().to_ascii_lowercase();
    if key.is_empty() {
        return Err(PolicyError::Config(
            "evaluator name must not be empty".to_string(),
        ));
    }
    Ok(key)
}
