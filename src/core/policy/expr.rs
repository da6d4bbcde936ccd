//! ACE expression trees
//!
//! Leaves are `(attribute, comparator, pattern)` terms resolved by an
//! evaluator; inner nodes combine them with AND / OR / NOT.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

impl Comparator {
    /// Ordering comparators (`<`, `<=`, `>`, `>=`)
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Comparator::Lt | Comparator::Le | Comparator::Gt | Comparator::Ge
        )
    }

    /// Operator symbol as written in ACL text
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::In => "in",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "=" | "==" | "eq" => Ok(Comparator::Eq),
            "!=" | "ne" => Ok(Comparator::Ne),
            "<" | "lt" => Ok(Comparator::Lt),
            "<=" | "le" => Ok(Comparator::Le),
            ">" | "gt" => Ok(Comparator::Gt),
            ">=" | "ge" => Ok(Comparator::Ge),
            "in" => Ok(Comparator::In),
            other => Err(format!("unknown comparator '{}'", other)),
        }
    }
}

/// A single attribute check
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub attribute: String,
    pub comparator: Comparator,
    pub pattern: String,
}

impl Term {
    pub fn new(
        attribute: impl Into<String>,
        comparator: Comparator,
        pattern: impl Into<String>,
    ) -> Self {
        Term {
            attribute: attribute.into(),
            comparator,
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} \"{}\"", self.attribute, self.comparator, self.pattern)
    }
}

/// Boolean expression over terms
///
/// An empty `And` is true and an empty `Or` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expr {
    Term(Term),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Leaf expression
    pub fn term(
        attribute: impl Into<String>,
        comparator: Comparator,
        pattern: impl Into<String>,
    ) -> Self {
        Expr::Term(Term::new(attribute, comparator, pattern))
    }

    pub fn and(children: Vec<Expr>) -> Self {
        Expr::And(children)
    }

    pub fn or(children: Vec<Expr>) -> Self {
        Expr::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Expr) -> Self {
        Expr::Not(Box::new(child))
    }

    /// Expression that is always true
    pub fn always() -> Self {
        Expr::And(Vec::new())
    }

    /// Visit every term, left to right
    pub fn for_each_term<'a>(&'a self, f: &mut impl FnMut(&'a Term)) {
        match self {
            Expr::Term(term) => f(term),
            Expr::And(children) | Expr::Or(children) => {
                for child in children {
                    child.for_each_term(f);
                }
            }
            Expr::Not(child) => child.for_each_term(f),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, children: &[Expr], op: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", child)?;
            }
            f.write_str(")")
        }

        match self {
            Expr::Term(term) => write!(f, "{}", term),
            Expr::And(children) if children.is_empty() => f.write_str("true"),
            Expr::Or(children) if children.is_empty() => f.write_str("false"),
            Expr::And(children) => join(f, children, "and"),
            Expr::Or(children) => join(f, children, "or"),
            Expr::Not(child) => write!(f, "not {}", child),
        }
    }
}
