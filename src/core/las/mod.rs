//! Attribute evaluators (LAS)
//!
//! Every term of an ACE expression names an attribute; the evaluator
//! registered under that name decides the term for a request:
//! - Verdicts are `True`, `False` or `Indeterminate`
//! - Each outcome says whether it may be memoized
//! - Evaluators may keep parsed or resolved state in a per-generation cookie
//!
//! External state (clock, group directory, DNS) reaches evaluators through
//! [`Capabilities`] at call time.

pub mod builtin;
mod capability;
mod registry;
mod wildcard;

pub use capability::{
    Capabilities, Clock, DnsResolver, FixedClock, GroupDirectory, NoDns, StaticDns, StaticGroups,
    SystemClock,
};
pub use registry::EvaluatorRegistry;
pub(crate) use wildcard::Wildcard;

use crate::error::{PolicyError, Result};
use crate::policy::Comparator;
use crate::request::{AuthContext, Subject};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque evaluator state owned by one generation
pub type Cookie = Arc<dyn Any + Send + Sync>;

/// Result of a single term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    True,
    False,
    /// The evaluator could not decide (treated as a failure)
    Indeterminate,
}

impl From<bool> for Verdict {
    fn from(value: bool) -> Self {
        if value {
            Verdict::True
        } else {
            Verdict::False
        }
    }
}

/// Whether a term result may be memoized for the rest of the generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cacheability {
    NotCacheable,
    Cacheable,
}

/// What to do with the term's cookie after a call
#[derive(Clone)]
pub enum CookieUpdate {
    Keep,
    Replace(Cookie),
    Clear,
}

impl fmt::Debug for CookieUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieUpdate::Keep => f.write_str("Keep"),
            CookieUpdate::Replace(_) => f.write_str("Replace(..)"),
            CookieUpdate::Clear => f.write_str("Clear"),
        }
    }
}

/// Inputs of one evaluator call
pub struct EvalCall<'a> {
    pub attribute: &'a str,
    pub comparator: Comparator,
    pub pattern: &'a str,
    pub subject: &'a Subject,
    pub resource: &'a str,
    pub auth: &'a AuthContext,
    /// Cookie stored by a previous call for the same term, if any
    pub cookie: Option<&'a Cookie>,
}

impl EvalCall<'_> {
    /// Previous cookie, if it holds a `T`
    pub fn cookie_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.cookie
            .and_then(|cookie| Arc::clone(cookie).downcast::<T>().ok())
    }

    /// Reuse state from the cookie, or build it and hand it back as a new cookie
    pub fn reuse_or<T, F>(&self, build: F) -> Result<(Arc<T>, CookieUpdate)>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T>,
    {
        if let Some(state) = self.cookie_as::<T>() {
            return Ok((state, CookieUpdate::Keep));
        }
        let state = Arc::new(build()?);
        let cookie: Cookie = state.clone();
        Ok((state, CookieUpdate::Replace(cookie)))
    }

    /// Membership verdict for this call's comparator
    pub fn membership(&self, matched: bool) -> Result<Verdict> {
        membership(self.attribute, self.comparator, matched)
    }

    /// Build an `EvaluatorFailure` for this call's attribute
    pub fn failure(&self, detail: impl Into<String>) -> PolicyError {
        PolicyError::evaluator_failure(self.attribute, detail)
    }
}

/// Output of one evaluator call
#[derive(Debug, Clone)]
pub struct EvalOutcome {
    pub verdict: Verdict,
    pub cacheability: Cacheability,
    pub cookie: CookieUpdate,
}

impl EvalOutcome {
    /// Cacheable outcome that leaves the cookie alone
    pub fn new(verdict: Verdict) -> Self {
        EvalOutcome {
            verdict,
            cacheability: Cacheability::Cacheable,
            cookie: CookieUpdate::Keep,
        }
    }

    pub fn not_cacheable(mut self) -> Self {
        self.cacheability = Cacheability::NotCacheable;
        self
    }

    pub fn with_cookie(mut self, update: CookieUpdate) -> Self {
        self.cookie = update;
        self
    }
}

/// A pluggable attribute evaluator
pub trait Evaluator: Send + Sync {
    /// Decide one term for one request
    fn evaluate(&self, call: &EvalCall<'_>, caps: &Capabilities) -> Result<EvalOutcome>;

    /// Check a comparator/pattern pair when the policy is bound
    fn validate(&self, _comparator: Comparator, _pattern: &str) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Release a cookie when its generation is retired
    fn flush(&self, _cookie: &Cookie) {}
}

/// Map a set-membership match through `eq` / `ne` / `in`
///
/// Any other comparator fails as an `EvaluatorFailure` naming `attribute`.
pub fn membership(attribute: &str, comparator: Comparator, matched: bool) -> Result<Verdict> {
    match comparator {
        Comparator::Eq | Comparator::In => Ok(Verdict::from(matched)),
        Comparator::Ne => Ok(Verdict::from(!matched)),
        other => Err(PolicyError::evaluator_failure(
            attribute,
            format!("comparator '{}' is not a membership test", other),
        )),
    }
}

/// Bind-time check for membership evaluators
pub fn require_membership(comparator: Comparator) -> std::result::Result<(), String> {
    match comparator {
        Comparator::Eq | Comparator::Ne | Comparator::In => Ok(()),
        other => Err(format!("comparator '{}' not supported", other)),
    }
}

/// Split a list pattern on `sep`, trimming and dropping empty items
pub(crate) fn split_list<'a>(pattern: &'a str, sep: &'a str) -> impl Iterator<Item = &'a str> {
    pattern
        .split(sep)
        .map(str::trim)
        .filter(|item| !item.is_empty())
}
