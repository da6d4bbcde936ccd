//! Policy data model
//!
//! - [`PolicySource`]: compiler output, named ACLs of ordered ACEs
//! - [`Expr`]: AND / OR / NOT trees over `(attribute, comparator, pattern)` terms
//! - [`ResourcePattern`]: `*` / `**` path scopes
//! - [`PolicyModel`]: a source bound to the evaluator registry

mod ace;
mod expr;
mod model;
mod pattern;

pub use ace::{Ace, Acl, Effect, PolicySource, Right};
pub use expr::{Comparator, Expr, Term};
pub use model::{BoundAce, BoundTerm, CompiledExpr, PolicyModel, TermId};
pub use pattern::ResourcePattern;
