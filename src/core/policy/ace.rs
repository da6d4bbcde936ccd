//! Compiled ACL records
//!
//! This is the output contract of the policy compiler: named ACLs holding
//! ordered access-control entries. Entries are evaluated in ACL order, then
//! in entry order inside each ACL.

use super::expr::Expr;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Effect of an access-control entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Allow the operation
    Allow,
    /// Deny the operation
    Deny,
}

/// Directory rights (requested operation kinds)
///
/// Names are case-insensitive when parsed or deserialized; `*` means `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Right {
    /// Read attribute values
    Read,
    /// Modify attribute values
    Write,
    /// Find entries in a search
    Search,
    /// Compare a value
    Compare,
    /// Add child entries
    Add,
    /// Delete entries
    Delete,
    /// Add or remove oneself as a value
    #[serde(rename = "selfwrite")]
    SelfWrite,
    /// Act as another identity
    Proxy,
    /// Every right
    All,
}

impl Right {
    /// All concrete rights, in display order
    pub const CONCRETE: [Right; 8] = [
        Right::Read,
        Right::Write,
        Right::Search,
        Right::Compare,
        Right::Add,
        Right::Delete,
        Right::SelfWrite,
        Right::Proxy,
    ];

    /// Check if granting `self` covers a request for `requested`
    pub fn covers(&self, requested: Right) -> bool {
        *self == Right::All || *self == requested
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Right::Read => "read",
            Right::Write => "write",
            Right::Search => "search",
            Right::Compare => "compare",
            Right::Add => "add",
            Right::Delete => "delete",
            Right::SelfWrite => "selfwrite",
            Right::Proxy => "proxy",
            Right::All => "all",
        }
    }
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Right {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Right::Read),
            "write" => Ok(Right::Write),
            "search" => Ok(Right::Search),
            "compare" => Ok(Right::Compare),
            "add" => Ok(Right::Add),
            "delete" => Ok(Right::Delete),
            "selfwrite" => Ok(Right::SelfWrite),
            "proxy" => Ok(Right::Proxy),
            "all" | "*" => Ok(Right::All),
            other => Err(format!("unknown right '{}'", other)),
        }
    }
}

impl TryFrom<String> for Right {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn all_rights() -> Vec<Right> {
    vec![Right::All]
}

/// A single access-control entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ace {
    /// Effect when the expression is true
    pub effect: Effect,

    /// Rights this entry applies to
    #[serde(default = "all_rights")]
    pub rights: Vec<Right>,

    /// Resource pattern (supports `*` and `**`)
    pub resource: String,

    /// Condition over subject/resource/auth attributes
    pub expr: Expr,
}

impl Ace {
    /// Create a new entry applying to all rights
    pub fn new(effect: Effect, resource: impl Into<String>, expr: Expr) -> Self {
        Ace {
            effect,
            rights: all_rights(),
            resource: resource.into(),
            expr,
        }
    }

    pub fn allow(resource: impl Into<String>, expr: Expr) -> Self {
        Self::new(Effect::Allow, resource, expr)
    }

    pub fn deny(resource: impl Into<String>, expr: Expr) -> Self {
        Self::new(Effect::Deny, resource, expr)
    }

    /// Restrict this entry to the given rights
    pub fn with_rights(mut self, rights: impl IntoIterator<Item = Right>) -> Self {
        self.rights = rights.into_iter().collect();
        self
    }

    /// Check if this entry applies to the requested right
    ///
    /// An empty rights list means every right.
    pub fn applies_to(&self, requested: Right) -> bool {
        self.rights.is_empty() || self.rights.iter().any(|r| r.covers(requested))
    }
}

/// A named ACL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    /// ACL name (unique within a policy source)
    pub tag: String,

    /// Entries in evaluation order
    pub entries: Vec<Ace>,
}

impl Acl {
    pub fn new(tag: impl Into<String>) -> Self {
        Acl {
            tag: tag.into(),
            entries: Vec::new(),
        }
    }

    /// Append an entry (builder style)
    pub fn with_entry(mut self, ace: Ace) -> Self {
        self.entries.push(ace);
        self
    }

    pub fn add_entry(&mut self, ace: Ace) {
        self.entries.push(ace);
    }
}

/// Complete compiler output: ordered named ACLs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySource {
    pub acls: Vec<Acl>,
}

impl PolicySource {
    /// Create an empty policy source (denies everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ACL (builder style)
    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.acls.push(acl);
        self
    }

    pub fn add_acl(&mut self, acl: Acl) {
        self.acls.push(acl);
    }

    /// Find an ACL by tag (case-insensitive)
    pub fn find(&self, tag: &str) -> Option<&Acl> {
        self.acls.iter().find(|acl| acl.tag.eq_ignore_ascii_case(tag))
    }

    /// ACL tags in evaluation order
    pub fn names(&self) -> Vec<&str> {
        self.acls.iter().map(|acl| acl.tag.as_str()).collect()
    }

    /// Total number of entries across all ACLs
    pub fn entry_count(&self) -> usize {
        self.acls.iter().map(|acl| acl.entries.len()).sum()
    }

    /// Parse policy from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize policy to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
