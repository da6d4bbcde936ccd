//! `ip` evaluator
//!
//! Pattern: comma-separated entries, each one of
//! - `*` - any address
//! - IPv4 wildcard such as `10.1.*` or `10.1.*.*`
//! - CIDR block (`10.0.0.0/8`, `2001:db8::/32`)
//! - exact IPv4 or IPv6 address
//!
//! An unknown client address is an evaluator failure.

use crate::error::Result;
use crate::las::{require_membership, split_list, Capabilities, EvalCall, EvalOutcome, Evaluator};
use crate::policy::Comparator;
use std::net::IpAddr;

#[derive(Debug, Default, Clone, Copy)]
pub struct IpEvaluator;

#[derive(Debug, Clone, PartialEq, Eq)]
enum IpPattern {
    /// Leading IPv4 octets that must match; empty matches every address
    V4Prefix(Vec<u8>),
    Cidr(IpAddr, u8),
    Exact(IpAddr),
}

impl IpPattern {
    fn parse(text: &str) -> std::result::Result<Self, String> {
        if let Some((addr, bits)) = text.split_once('/') {
            let addr: IpAddr = addr
                .trim()
                .parse()
                .map_err(|_| format!("bad network address in '{}'", text))?;
            let bits: u8 = bits
                .trim()
                .parse()
                .map_err(|_| format!("bad prefix length in '{}'", text))?;
            let max = if addr.is_ipv4() { 32 } else { 128 };
            if bits > max {
                return Err(format!("prefix length {} exceeds {}", bits, max));
            }
            return Ok(IpPattern::Cidr(addr, bits));
        }

        if text.contains('*') {
            let mut octets = Vec::new();
            let mut wild = false;
            let parts: Vec<&str> = text.split('.').collect();
            if parts.len() > 4 {
                return Err(format!("too many octets in '{}'", text));
            }
            for part in parts {
                match (part, wild) {
                    ("*", _) => wild = true,
                    (_, true) => return Err(format!("octet after wildcard in '{}'", text)),
                    (octet, false) => octets.push(
                        octet
                            .parse::<u8>()
                            .map_err(|_| format!("bad octet '{}' in '{}'", octet, text))?,
                    ),
                }
            }
            return Ok(IpPattern::V4Prefix(octets));
        }

        text.parse()
            .map(IpPattern::Exact)
            .map_err(|_| format!("'{}' is not an address", text))
    }

    fn matches(&self, ip: IpAddr) -> bool {
        match (self, ip) {
            (IpPattern::V4Prefix(prefix), IpAddr::V4(v4)) => {
                v4.octets().iter().zip(prefix).all(|(a, b)| a == b)
            }
            (IpPattern::V4Prefix(prefix), IpAddr::V6(_)) => prefix.is_empty(),
            (IpPattern::Cidr(IpAddr::V4(net), bits), IpAddr::V4(v4)) => {
                let mask = u32::MAX.checked_shl(32 - *bits as u32).unwrap_or(0);
                u32::from(*net) & mask == u32::from(v4) & mask
            }
            (IpPattern::Cidr(IpAddr::V6(net), bits), IpAddr::V6(v6)) => {
                let mask = u128::MAX.checked_shl(128 - *bits as u32).unwrap_or(0);
                u128::from(*net) & mask == u128::from(v6) & mask
            }
            (IpPattern::Cidr(..), _) => false,
            (IpPattern::Exact(expected), ip) => *expected == ip,
        }
    }
}

fn parse(pattern: &str) -> std::result::Result<Vec<IpPattern>, String> {
    let patterns = split_list(pattern, ",")
        .map(IpPattern::parse)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if patterns.is_empty() {
        return Err("empty address list".to_string());
    }
    Ok(patterns)
}

impl Evaluator for IpEvaluator {
    fn evaluate(&self, call: &EvalCall<'_>, _caps: &Capabilities) -> Result<EvalOutcome> {
        let ip = call
            .auth
            .client_ip
            .ok_or_else(|| call.failure("client address unknown"))?;
        let (patterns, update) =
            call.reuse_or(|| parse(call.pattern).map_err(|e| call.failure(e)))?;

        let matched = patterns.iter().any(|p| p.matches(ip));
        Ok(EvalOutcome::new(call.membership(matched)?).with_cookie(update))
    }

    fn validate(&self, comparator: Comparator, pattern: &str) -> std::result::Result<(), String> {
        require_membership(comparator)?;
        parse(pattern).map(|_| ())
    }
}
