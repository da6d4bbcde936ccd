//! Request inputs delivered by the protocol front end
//!
//! A request is a resource identifier, a requested [`Right`](crate::policy::Right),
//! the requesting [`Subject`] and the connection's [`AuthContext`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::str::FromStr;
use xxhash_rust::xxh3::Xxh3;

/// The requesting identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Bind DN (None for anonymous)
    pub dn: Option<String>,

    /// Group memberships known to the front end
    #[serde(default)]
    pub groups: Vec<String>,

    /// Additional subject attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl Subject {
    /// Unauthenticated subject
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Subject bound as `dn`
    pub fn user(dn: impl Into<String>) -> Self {
        Subject {
            dn: Some(dn.into()),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.into().to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.dn.is_none()
    }

    /// Normalized bind DN, if any
    pub fn normalized_dn(&self) -> Option<String> {
        self.dn.as_deref().map(normalize_dn)
    }

    /// Values of a subject attribute
    pub fn attribute(&self, name: &str) -> &[String] {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// How the connection authenticated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    None,
    Simple,
    Ssl,
    Sasl,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::Simple => "simple",
            AuthMethod::Ssl => "ssl",
            AuthMethod::Sasl => "sasl",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "anonymous" => Ok(AuthMethod::None),
            "simple" => Ok(AuthMethod::Simple),
            "ssl" | "tls" => Ok(AuthMethod::Ssl),
            "sasl" => Ok(AuthMethod::Sasl),
            other => Err(format!("unknown authentication method '{}'", other)),
        }
    }
}

/// Connection-level authentication data
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthContext {
    /// Client network address
    pub client_ip: Option<IpAddr>,

    /// Client host name, if the front end already resolved it
    pub client_dns: Option<String>,

    /// Security strength factor of the connection (0 = cleartext)
    #[serde(default)]
    pub ssf: u32,

    /// Authentication method
    #[serde(default)]
    pub method: AuthMethod,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }

    pub fn with_dns(mut self, host: impl Into<String>) -> Self {
        self.client_dns = Some(host.into());
        self
    }

    pub fn with_ssf(mut self, ssf: u32) -> Self {
        self.ssf = ssf;
        self
    }

    pub fn with_method(mut self, method: AuthMethod) -> Self {
        self.method = method;
        self
    }
}

/// 128-bit xxh3 fingerprint of the requester
///
/// Cached decisions and term results are keyed by this value so that they
/// are only reused for an identical subject and auth context.
pub fn fingerprint(subject: &Subject, auth: &AuthContext) -> u128 {
    let mut hasher = Xxh3::new();
    subject.hash(&mut hasher);
    auth.hash(&mut hasher);
    hasher.digest128()
}

/// Normalize a DN for comparison
///
/// Lowercases, trims whitespace around RDN separators and `=`.
pub fn normalize_dn(dn: &str) -> String {
    dn.split(',')
        .map(|rdn| match rdn.split_once('=') {
            Some((attr, value)) => format!("{}={}", attr.trim(), value.trim()),
            None => rdn.trim().to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
        .to_lowercase()
}

/// Parent DN of a normalized DN
pub fn parent_dn(dn: &str) -> Option<&str> {
    dn.split_once(',').map(|(_, parent)| parent)
}
