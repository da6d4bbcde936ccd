//! External collaborators handed to evaluators at call time

use crate::error::{PolicyError, Result};
use crate::request::normalize_dn;
use chrono::{Local, NaiveDateTime};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Wall-clock source for time-based evaluators
pub trait Clock: Send + Sync {
    /// Current local time
    fn now(&self) -> NaiveDateTime;
}

/// The system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A settable clock for tests and replay
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        FixedClock {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.write() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.read()
    }
}

/// Resolves group member sets
pub trait GroupDirectory: Send + Sync {
    /// Normalized member DNs of `group`, or None if the group does not exist
    fn members(&self, group: &str) -> Result<Option<HashSet<String>>>;
}

/// In-memory group directory
#[derive(Debug, Default)]
pub struct StaticGroups {
    groups: HashMap<String, HashSet<String>>,
    offline: bool,
}

impl StaticGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group with its member DNs
    pub fn with_group<I, S>(mut self, group: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.groups.insert(
            group.to_lowercase(),
            members.into_iter().map(|m| normalize_dn(m.as_ref())).collect(),
        );
        self
    }

    /// Make every lookup fail, as an unreachable backend would
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }
}

impl GroupDirectory for StaticGroups {
    fn members(&self, group: &str) -> Result<Option<HashSet<String>>> {
        if self.offline {
            return Err(PolicyError::evaluator_failure(
                "group",
                "group directory unreachable",
            ));
        }
        Ok(self.groups.get(&group.to_lowercase()).cloned())
    }
}

/// Reverse DNS lookups for the `dns` evaluator
pub trait DnsResolver: Send + Sync {
    fn reverse(&self, ip: IpAddr) -> Result<Option<String>>;
}

/// Resolver that never knows a name
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDns;

impl DnsResolver for NoDns {
    fn reverse(&self, _ip: IpAddr) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Fixed address-to-name table
#[derive(Debug, Default)]
pub struct StaticDns {
    names: HashMap<IpAddr, String>,
}

impl StaticDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, ip: IpAddr, host: impl Into<String>) -> Self {
        self.names.insert(ip, host.into());
        self
    }
}

impl DnsResolver for StaticDns {
    fn reverse(&self, ip: IpAddr) -> Result<Option<String>> {
        Ok(self.names.get(&ip).cloned())
    }
}

/// Call-time capabilities shared by all evaluators
#[derive(Clone)]
pub struct Capabilities {
    pub clock: Arc<dyn Clock>,
    pub groups: Option<Arc<dyn GroupDirectory>>,
    pub dns: Arc<dyn DnsResolver>,
}

impl Capabilities {
    pub fn new() -> Self {
        Capabilities {
            clock: Arc::new(SystemClock),
            groups: None,
            dns: Arc::new(NoDns),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_groups(mut self, groups: Arc<dyn GroupDirectory>) -> Self {
        self.groups = Some(groups);
        self
    }

    pub fn with_dns(mut self, dns: Arc<dyn DnsResolver>) -> Self {
        self.dns = dns;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("groups", &self.groups.is_some())
            .finish_non_exhaustive()
    }
}
