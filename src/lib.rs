//! # dsacl - Access-control decisions for a directory server
//!
//! `dsacl` decides whether a subject may perform an operation on a
//! directory resource by evaluating a compiled ACL policy:
//!
//! - **First-match ACLs**: ordered allow/deny entries, default deny
//! - **Pluggable evaluators**: group, userdn, ip, dns, time, ssf and more
//! - **Per-generation cache**: decisions, term results and evaluator cookies
//! - **Atomic reload**: new policy is built off to the side and swapped in
//!   without disturbing requests in flight
//!
//! ## Quick Start
//!
//! ```rust
//! use dsacl::policy::{Ace, Acl, Comparator, Expr, PolicySource, Right};
//! use dsacl::{AccessControl, AuthContext, Subject};
//!
//! # fn main() -> dsacl::Result<()> {
//! let policy = PolicySource::new().with_acl(
//!     Acl::new("secret")
//!         .with_entry(Ace::deny("/secret", Expr::term("group", Comparator::Ne, "admins")))
//!         .with_entry(Ace::allow("/secret", Expr::term("group", Comparator::Eq, "*"))),
//! );
//! let acl = AccessControl::new(policy)?;
//!
//! let admin = Subject::user("uid=root,o=example").with_group("admins");
//! let guest = Subject::user("uid=guest,o=example").with_group("guests");
//! let auth = AuthContext::new();
//!
//! assert!(acl.evaluate("/secret", Right::Read, &admin, &auth).is_allowed());
//! assert!(acl.evaluate("/secret", Right::Read, &guest, &auth).is_denied());
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom evaluators and configuration
//!
//! ```rust
//! use dsacl::las::{Capabilities, EvalCall, EvalOutcome, Evaluator, Verdict};
//! use dsacl::{AccessControlBuilder, AclConfig, Result};
//!
//! struct Maintenance;
//!
//! impl Evaluator for Maintenance {
//!     fn evaluate(&self, _call: &EvalCall<'_>, _caps: &Capabilities) -> Result<EvalOutcome> {
//!         Ok(EvalOutcome::new(Verdict::False))
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let config = AclConfig::from_toml_str("[cache]\nshards = 4\n")?;
//! let acl = AccessControlBuilder::new()
//!     .config(config)
//!     .evaluator("maintenance", Maintenance)
//!     .build()?;
//! assert!(acl.registry().contains("maintenance"));
//! # Ok(())
//! # }
//! ```

pub mod core;

pub use crate::core::{cache, config, engine, error, generation, las, policy, request};

pub use crate::core::{
    config::{AclConfig, CacheConfig, EvaluatorConfig},
    engine::{Access, Decision, Reason},
    error::{PolicyError, Result},
    generation::GenerationRef,
    request::{AuthContext, AuthMethod, Subject},
};

use crate::core::engine::{CacheMode, DecisionEngine, Request};
use crate::core::generation::{Generation, GenerationManager};
use crate::core::las::{Capabilities, Evaluator, EvaluatorRegistry};
use crate::core::policy::{PolicySource, Right};
use crossbeam::utils::CachePadded;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Observability counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Decisions served from the cache
    pub cache_hit_count: u64,
    /// Decisions computed with the cache enabled
    pub cache_miss_count: u64,
    /// Id of the current generation
    pub active_generation_id: u64,
    /// Registered evaluators
    pub evaluator_count: usize,
    /// Requests denied because an evaluator failed
    pub evaluator_failure_count: u64,
    /// Term results served from the memo
    pub term_hit_count: u64,
    /// Terms sent to an evaluator with the cache enabled
    pub term_miss_count: u64,
    /// Successful reloads
    pub reload_count: u64,
    /// Decisions cached in the current generation
    pub cached_decisions: usize,
}

/// Access-control decision point
///
/// Owns the evaluator registry, the current policy generation and the
/// engine counters. Safe to share across threads.
pub struct AccessControl {
    config: AclConfig,
    registry: Arc<EvaluatorRegistry>,
    generations: GenerationManager,
    engine: DecisionEngine,
    reloads: CachePadded<AtomicU64>,
}

impl AccessControl {
    /// Decision point with default configuration and built-in evaluators
    pub fn new(policy: PolicySource) -> Result<Self> {
        AccessControlBuilder::new().policy(policy).build()
    }

    /// Builder for custom configuration
    pub fn builder() -> AccessControlBuilder {
        AccessControlBuilder::new()
    }

    /// Decide one request against the current generation
    pub fn evaluate(
        &self,
        resource: &str,
        right: Right,
        subject: &Subject,
        auth: &AuthContext,
    ) -> Decision {
        let generation = self.current();
        self.evaluate_in(&generation, resource, right, subject, auth)
    }

    /// Decide one request against a specific generation
    pub fn evaluate_in(
        &self,
        generation: &GenerationRef,
        resource: &str,
        right: Right,
        subject: &Subject,
        auth: &AuthContext,
    ) -> Decision {
        let request = Request {
            resource,
            right,
            subject,
            auth,
        };
        self.engine.evaluate(generation, &request, self.cache_mode())
    }

    /// Decide without reading or filling any cache table
    pub fn evaluate_uncached(
        &self,
        resource: &str,
        right: Right,
        subject: &Subject,
        auth: &AuthContext,
    ) -> Decision {
        let generation = self.current();
        let request = Request {
            resource,
            right,
            subject,
            auth,
        };
        self.engine
            .evaluate(&generation, &request, CacheMode::Bypass)
    }

    /// Decision for every concrete right on `resource`
    pub fn effective_rights(
        &self,
        resource: &str,
        subject: &Subject,
        auth: &AuthContext,
    ) -> Vec<(Right, Decision)> {
        let generation = self.current();
        self.engine
            .effective_rights(&generation, resource, subject, auth, self.cache_mode())
    }

    /// Evaluate on tokio's blocking pool
    #[cfg(feature = "async")]
    pub async fn evaluate_async(
        self: Arc<Self>,
        resource: String,
        right: Right,
        subject: Subject,
        auth: AuthContext,
    ) -> Decision {
        let handle = tokio::task::spawn_blocking(move || {
            self.evaluate(&resource, right, &subject, &auth)
        });
        match handle.await {
            Ok(decision) => decision,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                warn!("Evaluation task cancelled: {}", e);
                Decision::deny(Reason::EvaluatorFailure {
                    attribute: "runtime".to_string(),
                    acl: String::new(),
                    ace: 0,
                    detail: e.to_string(),
                })
            }
        }
    }

    /// Replace the policy
    ///
    /// The new generation is built first; on error the current generation
    /// stays in place.
    pub fn reload(&self, policy: PolicySource) -> Result<()> {
        let generation = match Generation::build(policy, &self.registry, &self.config.cache) {
            Ok(generation) => generation,
            Err(e) => {
                warn!("Policy reload rejected: {}", e);
                return Err(e);
            }
        };
        let published = self.generations.publish(generation);
        self.reloads.fetch_add(1, Ordering::Relaxed);
        info!(
            "Policy reloaded: generation {} with {} entries",
            published.id(),
            published.model().len()
        );
        Ok(())
    }

    /// Replace the policy from a JSON document
    pub fn reload_json(&self, json: &str) -> Result<()> {
        self.reload(PolicySource::from_json(json)?)
    }

    /// Replace the policy from a JSON file
    pub fn reload_file(&self, path: &Path) -> Result<()> {
        let json = std::fs::read_to_string(path)?;
        self.reload_json(&json)
    }

    /// Handle to the current generation
    pub fn current(&self) -> GenerationRef {
        self.generations.current()
    }

    pub fn stats(&self) -> Stats {
        let counters = self.engine.counters();
        let current = self.current();
        Stats {
            cache_hit_count: counters.cache_hits,
            cache_miss_count: counters.cache_misses,
            active_generation_id: current.id(),
            evaluator_count: self.registry.len(),
            evaluator_failure_count: counters.evaluator_failures,
            term_hit_count: counters.term_hits,
            term_miss_count: counters.term_misses,
            reload_count: self.reloads.load(Ordering::Relaxed),
            cached_decisions: current.cache().decision_count(),
        }
    }

    /// The evaluator registry; new registrations apply from the next reload
    pub fn registry(&self) -> &EvaluatorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AclConfig {
        &self.config
    }

    fn cache_mode(&self) -> CacheMode {
        if self.config.cache.enabled {
            CacheMode::Shared
        } else {
            CacheMode::Bypass
        }
    }
}

impl std::fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControl")
            .field("generation", &self.generations.current_id())
            .field("evaluators", &self.registry.len())
            .finish()
    }
}

/// Builder for [`AccessControl`]
pub struct AccessControlBuilder {
    config: AclConfig,
    capabilities: Capabilities,
    evaluators: Vec<(String, Arc<dyn Evaluator>)>,
    policy: Option<PolicySource>,
}

impl AccessControlBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        AccessControlBuilder {
            config: AclConfig::default(),
            capabilities: Capabilities::default(),
            evaluators: Vec::new(),
            policy: None,
        }
    }

    /// Use the given configuration
    pub fn config(mut self, config: AclConfig) -> Self {
        self.config = config;
        self
    }

    /// Clock, group directory and DNS resolver for evaluators
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Register an additional evaluator
    pub fn evaluator<E: Evaluator + 'static>(mut self, name: impl Into<String>, evaluator: E) -> Self {
        self.evaluators.push((name.into(), Arc::new(evaluator)));
        self
    }

    /// Initial policy (overrides `policy_file` from the configuration)
    pub fn policy(mut self, policy: PolicySource) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Build the decision point
    pub fn build(self) -> Result<AccessControl> {
        self.config.validate()?;

        let registry = if self.config.evaluators.builtins {
            EvaluatorRegistry::with_builtins_except(&self.config.evaluators.disabled)
        } else {
            EvaluatorRegistry::new()
        };
        for (name, evaluator) in self.evaluators {
            registry.register_arc(&name, evaluator)?;
        }

        let policy = match (self.policy, &self.config.policy_file) {
            (Some(policy), _) => policy,
            (None, Some(path)) => {
                debug!("Loading initial policy from {}", path.display());
                PolicySource::from_json(&std::fs::read_to_string(path)?)?
            }
            (None, None) => PolicySource::new(),
        };

        let initial = Generation::build(policy, &registry, &self.config.cache)?;
        info!(
            "Access control ready: {} evaluator(s), {} entries, cache {}",
            registry.len(),
            initial.model().len(),
            if self.config.cache.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );

        Ok(AccessControl {
            config: self.config,
            registry: Arc::new(registry),
            generations: GenerationManager::new(initial),
            engine: DecisionEngine::new(self.capabilities),
            reloads: CachePadded::new(AtomicU64::new(0)),
        })
    }
}

impl Default for AccessControlBuilder {
    fn default() -> Self {
        Self::new()
    }
}
