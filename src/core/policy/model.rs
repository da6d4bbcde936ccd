//! Bound policy model
//!
//! A [`PolicySource`] checked against an [`EvaluatorRegistry`]: resource
//! patterns compiled, every term bound to its evaluator and interned. The
//! model is immutable; a reload binds a new one.

use super::ace::{Effect, PolicySource, Right};
use super::expr::{Comparator, Expr, Term};
use super::pattern::ResourcePattern;
use crate::error::{PolicyError, Result};
use crate::las::{Evaluator, EvaluatorRegistry};
use ahash::RandomState;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Interned term identifier, unique within one model
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

impl TermId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Expression tree with terms replaced by their ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledExpr {
    Term(TermId),
    And(Vec<CompiledExpr>),
    Or(Vec<CompiledExpr>),
    Not(Box<CompiledExpr>),
}

/// A term bound to its evaluator
pub struct BoundTerm {
    pub term: Term,
    pub evaluator: Arc<dyn Evaluator>,
}

impl fmt::Debug for BoundTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundTerm").field("term", &self.term).finish()
    }
}

/// An ACE ready for evaluation
#[derive(Debug)]
pub struct BoundAce {
    /// Tag of the owning ACL
    pub acl: Arc<str>,
    /// Position inside the owning ACL
    pub number: usize,
    pub effect: Effect,
    pub rights: Vec<Right>,
    pub pattern: ResourcePattern,
    pub expr: CompiledExpr,
}

impl BoundAce {
    pub fn applies_to(&self, requested: Right) -> bool {
        self.rights.iter().any(|r| r.covers(requested))
    }
}

#[derive(Debug)]
pub struct PolicyModel {
    source: PolicySource,
    entries: Vec<BoundAce>,
    terms: Vec<BoundTerm>,
}

impl PolicyModel {
    /// Bind a policy source
    ///
    /// # Errors
    ///
    /// `InvalidPolicy` for duplicate ACL tags, malformed resource patterns,
    /// unknown attributes, or comparator/pattern pairs the evaluator rejects.
    /// An ACE listing no rights binds as `all`.
    pub fn bind(source: PolicySource, registry: &EvaluatorRegistry) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut interned: HashMap<(String, Comparator, String), TermId, RandomState> =
            HashMap::default();
        let mut terms = Vec::new();
        let mut entries = Vec::with_capacity(source.entry_count());

        for acl in &source.acls {
            if !seen.insert(acl.tag.to_lowercase()) {
                return Err(PolicyError::invalid_policy(
                    &acl.tag,
                    0,
                    "duplicate ACL tag",
                ));
            }
            let tag: Arc<str> = Arc::from(acl.tag.as_str());

            for (number, ace) in acl.entries.iter().enumerate() {
                let invalid = |reason: String| PolicyError::invalid_policy(&acl.tag, number, reason);

                let pattern = ResourcePattern::new(&ace.resource)
                    .map_err(|e| invalid(e.to_string()))?;

                let mut binder = Binder {
                    registry,
                    interned: &mut interned,
                    terms: &mut terms,
                };
                let expr = binder.compile(&ace.expr).map_err(invalid)?;

                entries.push(BoundAce {
                    acl: tag.clone(),
                    number,
                    effect: ace.effect,
                    // No rights listed means every right
                    rights: if ace.rights.is_empty() {
                        vec![Right::All]
                    } else {
                        ace.rights.clone()
                    },
                    pattern,
                    expr,
                });
            }
        }

        Ok(PolicyModel {
            source,
            entries,
            terms,
        })
    }

    /// Indices of the entries whose pattern matches `resource`, in order
    pub fn entry_indices_for(&self, resource: &str) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, ace)| ace.pattern.matches(resource))
            .map(|(i, _)| i)
            .collect()
    }

    /// Entries whose pattern matches `resource`, in order
    pub fn entries_for<'a>(&'a self, resource: &'a str) -> impl Iterator<Item = &'a BoundAce> + 'a {
        self.entries
            .iter()
            .filter(move |ace| ace.pattern.matches(resource))
    }

    pub fn entry(&self, index: usize) -> Option<&BoundAce> {
        self.entries.get(index)
    }

    pub fn term(&self, id: TermId) -> Option<&BoundTerm> {
        self.terms.get(id.index())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct terms
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn acl_names(&self) -> Vec<&str> {
        self.source.names()
    }

    /// The source this model was bound from
    pub fn source(&self) -> &PolicySource {
        &self.source
    }
}

struct Binder<'a> {
    registry: &'a EvaluatorRegistry,
    interned: &'a mut HashMap<(String, Comparator, String), TermId, RandomState>,
    terms: &'a mut Vec<BoundTerm>,
}

impl Binder<'_> {
    fn compile(&mut self, expr: &Expr) -> std::result::Result<CompiledExpr, String> {
        Ok(match expr {
            Expr::Term(term) => CompiledExpr::Term(self.intern(term)?),
            Expr::And(children) => CompiledExpr::And(self.compile_all(children)?),
            Expr::Or(children) => CompiledExpr::Or(self.compile_all(children)?),
            Expr::Not(child) => CompiledExpr::Not(Box::new(self.compile(child)?)),
        })
    }

    fn compile_all(&mut self, children: &[Expr]) -> std::result::Result<Vec<CompiledExpr>, String> {
        children.iter().map(|child| self.compile(child)).collect()
    }

    fn intern(&mut self, term: &Term) -> std::result::Result<TermId, String> {
        let attribute = term.attribute.trim().to_ascii_lowercase();
        let key = (attribute.clone(), term.comparator, term.pattern.clone());
        if let Some(id) = self.interned.get(&key) {
            return Ok(*id);
        }

        let evaluator = self
            .registry
            .lookup(&attribute)
            .map_err(|_| format!("unknown attribute '{}'", term.attribute))?;
        evaluator
            .validate(term.comparator, &term.pattern)
            .map_err(|reason| format!("{}: {}", term, reason))?;

        let id = TermId(self.terms.len() as u32);
        self.terms.push(BoundTerm {
            term: Term::new(attribute, term.comparator, term.pattern.clone()),
            evaluator,
        });
        self.interned.insert(key, id);
        Ok(id)
    }
}
