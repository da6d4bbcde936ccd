//! Policy generations
//!
//! A generation bundles one bound [`PolicyModel`] with its own
//! [`DecisionCache`] and cookie pool. Generations are built off to the
//! side, then published with one pointer swap. Readers keep whatever
//! generation they fetched alive through their [`GenerationRef`]; the last
//! reference to drop retires it and flushes its cookies.

use crate::cache::DecisionCache;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::las::EvaluatorRegistry;
use crate::policy::{PolicyModel, PolicySource};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, info};

/// One immutable policy version plus its cache
pub struct Generation {
    id: u64,
    built_at: DateTime<Utc>,
    model: PolicyModel,
    cache: DecisionCache,
}

impl Generation {
    /// Bind `source` and allocate an empty cache
    ///
    /// The id stays 0 until the generation is published.
    pub fn build(
        source: PolicySource,
        registry: &EvaluatorRegistry,
        config: &CacheConfig,
    ) -> Result<Self> {
        let model = PolicyModel::bind(source, registry)?;
        let cache = DecisionCache::new(config, model.term_count());
        debug!(
            "Built generation: {} ACL(s), {} entries, {} distinct terms",
            model.acl_names().len(),
            model.len(),
            model.term_count()
        );
        Ok(Generation {
            id: 0,
            built_at: Utc::now(),
            model,
            cache,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn model(&self) -> &PolicyModel {
        &self.model
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }
}

impl Drop for Generation {
    fn drop(&mut self) {
        let cookies = self.cache.drain_cookies();
        let flushed = cookies.len();
        for (id, cookie) in cookies {
            if let Some(bound) = self.model.term(id) {
                bound.evaluator.flush(&cookie);
            }
        }
        debug!(
            "Retired generation {} ({} cached decisions, {} cookies flushed)",
            self.id,
            self.cache.decision_count(),
            flushed
        );
    }
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generation")
            .field("id", &self.id)
            .field("built_at", &self.built_at)
            .field("entries", &self.model.len())
            .field("cache", &self.cache)
            .finish()
    }
}

/// Shared handle to a published generation
#[derive(Debug, Clone)]
pub struct GenerationRef(Arc<Generation>);

impl GenerationRef {
    /// Check if both handles point at the same generation
    pub fn ptr_eq(&self, other: &GenerationRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for GenerationRef {
    type Target = Generation;

    fn deref(&self) -> &Generation {
        &self.0
    }
}

struct Slot {
    current: GenerationRef,
    last_id: u64,
}

/// Owner of the current-generation pointer
pub struct GenerationManager {
    slot: RwLock<Slot>,
}

impl GenerationManager {
    /// Publish `initial` as generation 1
    pub fn new(mut initial: Generation) -> Self {
        initial.id = 1;
        info!("Published generation 1");
        GenerationManager {
            slot: RwLock::new(Slot {
                current: GenerationRef(Arc::new(initial)),
                last_id: 1,
            }),
        }
    }

    /// Handle to the current generation
    pub fn current(&self) -> GenerationRef {
        self.slot.read().current.clone()
    }

    /// Make `generation` current and return a handle to it
    pub fn publish(&self, mut generation: Generation) -> GenerationRef {
        let (published, replaced) = {
            let mut slot = self.slot.write();
            slot.last_id += 1;
            generation.id = slot.last_id;
            let published = GenerationRef(Arc::new(generation));
            let replaced = std::mem::replace(&mut slot.current, published.clone());
            (published, replaced)
        };
        info!(
            "Published generation {} (replacing {})",
            published.id(),
            replaced.id()
        );
        // Drop the old handle outside the lock
        drop(replaced);
        published
    }

    /// Id of the current generation
    pub fn current_id(&self) -> u64 {
        self.slot.read().current.id()
    }
}

impl std::fmt::Debug for GenerationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationManager")
            .field("current", &self.current_id())
            .finish()
    }
}
