//! Decision engine with first-match precedence
//!
//! Walks the entries bound to a resource in declared order:
//! - entries whose rights do not cover the request are skipped
//! - the first entry whose expression is true decides (allow or deny)
//! - no true entry, or no entry at all, denies
//! - an evaluator failure anywhere on the path denies (fail-closed)
//!
//! With [`CacheMode::Shared`] the generation's cache tables and cookies
//! are consulted and filled; [`CacheMode::Bypass`] touches neither.

use crate::cache::{CompiledList, DecisionKey, TermKey};
use crate::generation::Generation;
use crate::las::{Cacheability, Capabilities, CookieUpdate, EvalCall, Verdict};
use crate::policy::{BoundAce, CompiledExpr, Effect, Right, TermId};
use crate::request::{fingerprint, AuthContext, Subject};
use crossbeam::utils::CachePadded;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Final access verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Allow,
    Deny,
}

/// Why a decision was reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    /// A true ALLOW entry
    AllowedBy { acl: String, ace: usize },
    /// A true DENY entry
    DeniedBy { acl: String, ace: usize },
    /// No entry is bound to the resource
    NoMatchingAcl,
    /// Entries are bound but none was true
    NoMatchingAce,
    /// An evaluator could not decide
    EvaluatorFailure {
        attribute: String,
        acl: String,
        ace: usize,
        detail: String,
    },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::AllowedBy { acl, ace } => write!(f, "allowed by {}#{}", acl, ace),
            Reason::DeniedBy { acl, ace } => write!(f, "denied by {}#{}", acl, ace),
            Reason::NoMatchingAcl => f.write_str("no ACL applies to the resource"),
            Reason::NoMatchingAce => f.write_str("no entry matched"),
            Reason::EvaluatorFailure {
                attribute,
                acl,
                ace,
                detail,
            } => write!(
                f,
                "evaluator '{}' failed in {}#{}: {}",
                attribute, acl, ace, detail
            ),
        }
    }
}

/// Access decision with its reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub access: Access,
    pub reason: Reason,
}

impl Decision {
    pub fn allow(reason: Reason) -> Self {
        Decision {
            access: Access::Allow,
            reason,
        }
    }

    pub fn deny(reason: Reason) -> Self {
        Decision {
            access: Access::Deny,
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.access == Access::Allow
    }

    pub fn is_denied(&self) -> bool {
        self.access == Access::Deny
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.reason, Reason::EvaluatorFailure { .. })
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let access = match self.access {
            Access::Allow => "ALLOW",
            Access::Deny => "DENY",
        };
        write!(f, "{} ({})", access, self.reason)
    }
}

/// Whether an evaluation may use the generation's cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Shared,
    Bypass,
}

/// One access request
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub resource: &'a str,
    pub right: Right,
    pub subject: &'a Subject,
    pub auth: &'a AuthContext,
}

/// Lifetime counters, shared by every generation
#[derive(Debug, Default)]
struct EngineCounters {
    cache_hits: CachePadded<AtomicU64>,
    cache_misses: CachePadded<AtomicU64>,
    term_hits: CachePadded<AtomicU64>,
    term_misses: CachePadded<AtomicU64>,
    evaluator_failures: CachePadded<AtomicU64>,
}

/// Point-in-time copy of the engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub term_hits: u64,
    pub term_misses: u64,
    pub evaluator_failures: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub struct DecisionEngine {
    capabilities: Capabilities,
    counters: EngineCounters,
}

impl DecisionEngine {
    pub fn new(capabilities: Capabilities) -> Self {
        DecisionEngine {
            capabilities,
            counters: EngineCounters::default(),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Decide one request against `generation`
    ///
    /// Never fails: evaluator errors become a DENY carrying the failing
    /// attribute and entry.
    pub fn evaluate(&self, generation: &Generation, request: &Request<'_>, mode: CacheMode) -> Decision {
        let fingerprint = fingerprint(request.subject, request.auth);
        let model = generation.model();

        // RESOLVE_LIST
        let list = match mode {
            CacheMode::Shared => generation
                .cache()
                .list_for(request.resource, || model.entry_indices_for(request.resource)),
            CacheMode::Bypass => CompiledList::new(model.entry_indices_for(request.resource)),
        };
        if list.is_empty() {
            debug!("No ACL applies to '{}'", request.resource);
            return Decision::deny(Reason::NoMatchingAcl);
        }

        let key = match mode {
            CacheMode::Shared => {
                let key = DecisionKey {
                    resource: request.resource.to_string(),
                    right: request.right,
                    list: list.id,
                    fingerprint,
                };
                if let Some(hit) = generation.cache().get(&key) {
                    bump(&self.counters.cache_hits);
                    return hit.decision;
                }
                bump(&self.counters.cache_misses);
                Some(key)
            }
            CacheMode::Bypass => None,
        };

        let mut walk = Walk {
            engine: self,
            generation,
            request,
            fingerprint,
            mode,
            consulted: Vec::new(),
            cacheable: true,
        };
        let decision = walk.run(&list);

        debug!(
            "{} {} on '{}' in generation {}: {}",
            request.subject.dn.as_deref().unwrap_or("anonymous"),
            request.right,
            request.resource,
            generation.id(),
            decision
        );

        if let Some(key) = key {
            let cacheable = walk.cacheable && !decision.is_failure();
            generation
                .cache()
                .put(key, decision.clone(), walk.consulted, cacheable);
        }
        decision
    }

    /// Decide every concrete right on one resource
    pub fn effective_rights(
        &self,
        generation: &Generation,
        resource: &str,
        subject: &Subject,
        auth: &AuthContext,
        mode: CacheMode,
    ) -> Vec<(Right, Decision)> {
        Right::CONCRETE
            .iter()
            .map(|&right| {
                let request = Request {
                    resource,
                    right,
                    subject,
                    auth,
                };
                (right, self.evaluate(generation, &request, mode))
            })
            .collect()
    }

    pub fn counters(&self) -> CounterSnapshot {
        let c = &self.counters;
        CounterSnapshot {
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            cache_misses: c.cache_misses.load(Ordering::Relaxed),
            term_hits: c.term_hits.load(Ordering::Relaxed),
            term_misses: c.term_misses.load(Ordering::Relaxed),
            evaluator_failures: c.evaluator_failures.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("counters", &self.counters())
            .finish()
    }
}

struct TermFailure {
    attribute: String,
    detail: String,
}

/// State of one request walk
struct Walk<'a> {
    engine: &'a DecisionEngine,
    generation: &'a Generation,
    request: &'a Request<'a>,
    fingerprint: u128,
    mode: CacheMode,
    consulted: Vec<TermId>,
    cacheable: bool,
}

impl Walk<'_> {
    fn run(&mut self, list: &CompiledList) -> Decision {
        let generation = self.generation;
        let model = generation.model();
        for &index in list.entries.iter() {
            let Some(ace) = model.entry(index) else {
                continue;
            };
            if !ace.applies_to(self.request.right) {
                continue;
            }

            // EVALUATE_ACE[i]
            match self.eval(&ace.expr) {
                Ok(false) => continue,
                Ok(true) => return Self::terminal(ace),
                Err(failure) => return self.fail(ace, failure),
            }
        }
        Decision::deny(Reason::NoMatchingAce)
    }

    fn terminal(ace: &BoundAce) -> Decision {
        let acl = ace.acl.to_string();
        match ace.effect {
            Effect::Allow => Decision::allow(Reason::AllowedBy {
                acl,
                ace: ace.number,
            }),
            Effect::Deny => Decision::deny(Reason::DeniedBy {
                acl,
                ace: ace.number,
            }),
        }
    }

    fn fail(&mut self, ace: &BoundAce, failure: TermFailure) -> Decision {
        bump(&self.engine.counters.evaluator_failures);
        self.cacheable = false;
        warn!(
            "Evaluator '{}' failed in {}#{} for '{}': {}; denying",
            failure.attribute, ace.acl, ace.number, self.request.resource, failure.detail
        );
        Decision::deny(Reason::EvaluatorFailure {
            attribute: failure.attribute,
            acl: ace.acl.to_string(),
            ace: ace.number,
            detail: failure.detail,
        })
    }

    fn eval(&mut self, expr: &CompiledExpr) -> Result<bool, TermFailure> {
        match expr {
            CompiledExpr::Term(id) => self.term(*id),
            CompiledExpr::And(children) => {
                for child in children {
                    if !self.eval(child)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            CompiledExpr::Or(children) => {
                for child in children {
                    if self.eval(child)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            CompiledExpr::Not(child) => Ok(!self.eval(child)?),
        }
    }

    fn term(&mut self, id: TermId) -> Result<bool, TermFailure> {
        let engine = self.engine;
        let generation = self.generation;
        let counters = &engine.counters;
        let cache = generation.cache();
        let shared = self.mode == CacheMode::Shared;
        self.consulted.push(id);

        let key = TermKey {
            resource: self.request.resource.to_string(),
            term: id,
            fingerprint: self.fingerprint,
        };
        if shared {
            if let Some(verdict) = cache.term(&key) {
                bump(&counters.term_hits);
                return Ok(verdict == Verdict::True);
            }
            bump(&counters.term_misses);
        }

        let bound = generation.model().term(id).ok_or_else(|| TermFailure {
            attribute: id.to_string(),
            detail: "term is not bound".to_string(),
        })?;
        let cookie = if shared { cache.cookie(id) } else { None };
        let call = EvalCall {
            attribute: &bound.term.attribute,
            comparator: bound.term.comparator,
            pattern: &bound.term.pattern,
            subject: self.request.subject,
            resource: self.request.resource,
            auth: self.request.auth,
            cookie: cookie.as_ref(),
        };

        let outcome = bound
            .evaluator
            .evaluate(&call, &engine.capabilities)
            .map_err(|e| TermFailure {
                attribute: bound.term.attribute.clone(),
                detail: e.to_string(),
            })?;

        if shared {
            let displaced = match outcome.cookie {
                CookieUpdate::Keep => None,
                CookieUpdate::Replace(cookie) => cache.store_cookie(id, cookie),
                CookieUpdate::Clear => cache.clear_cookie(id),
            };
            if let Some(old) = displaced {
                bound.evaluator.flush(&old);
            }
        }

        match outcome.verdict {
            Verdict::Indeterminate => Err(TermFailure {
                attribute: bound.term.attribute.clone(),
                detail: "indeterminate".to_string(),
            }),
            verdict => {
                match outcome.cacheability {
                    Cacheability::Cacheable if shared => cache.put_term(key, verdict),
                    Cacheability::Cacheable => {}
                    Cacheability::NotCacheable => self.cacheable = false,
                }
                Ok(verdict == Verdict::True)
            }
        }
    }
}
