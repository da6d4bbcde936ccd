//! dsacl-eval
//!
//! Evaluate one access request against a JSON policy and print the
//! decision as JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dsacl::policy::{PolicySource, Right};
use dsacl::{AccessControl, AclConfig, AuthContext, AuthMethod, Subject};
use serde::Serialize;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dsacl-eval")]
#[command(about = "Evaluate a directory access request against an ACL policy")]
struct Args {
    /// Policy JSON file
    #[arg(short = 'p', long)]
    policy: PathBuf,

    /// Configuration TOML file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Target resource, e.g. /people/alice
    resource: String,

    /// Requested right (read, write, search, compare, add, delete, selfwrite, proxy)
    #[arg(short = 'r', long, default_value = "read")]
    right: Right,

    /// Bind DN of the requester (anonymous when omitted)
    #[arg(short = 'd', long)]
    dn: Option<String>,

    /// Group the requester belongs to (repeatable)
    #[arg(short = 'g', long = "group")]
    groups: Vec<String>,

    /// Requester attribute as name=value, e.g. nsrole=cn=managers,o=example (repeatable)
    #[arg(short = 'a', long = "attr")]
    attrs: Vec<String>,

    /// Client address
    #[arg(long)]
    ip: Option<IpAddr>,

    /// Client host name
    #[arg(long)]
    dns: Option<String>,

    /// Security strength factor of the connection
    #[arg(long, default_value = "0")]
    ssf: u32,

    /// Authentication method (none, simple, ssl, sasl)
    #[arg(short = 'm', long, default_value = "none")]
    method: AuthMethod,

    /// Report every right instead of only --right
    #[arg(long)]
    effective: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct RightReport {
    right: Right,
    decision: dsacl::Decision,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("dsacl=debug,dsacl_eval=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dsacl=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file {} does not exist", path.display());
            }
            AclConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
        None => AclConfig::default(),
    };

    let json = std::fs::read_to_string(&args.policy)
        .with_context(|| format!("failed to read {}", args.policy.display()))?;
    let policy = PolicySource::from_json(&json)
        .with_context(|| format!("failed to parse {}", args.policy.display()))?;
    info!(
        "Loaded {} ACL(s) with {} entries from {}",
        policy.acls.len(),
        policy.entry_count(),
        args.policy.display()
    );

    let acl = AccessControl::builder()
        .config(config)
        .policy(policy)
        .build()
        .context("policy rejected")?;

    let mut subject = match &args.dn {
        Some(dn) => Subject::user(dn.as_str()),
        None => Subject::anonymous(),
    }
    .with_groups(args.groups.iter().map(String::as_str));
    for attr in &args.attrs {
        let Some((name, value)) = attr.split_once('=') else {
            bail!("attribute '{}' is not of the form name=value", attr);
        };
        subject = subject.with_attribute(name.trim(), value.trim());
    }

    let mut auth = AuthContext::new()
        .with_ssf(args.ssf)
        .with_method(args.method);
    if let Some(ip) = args.ip {
        auth = auth.with_ip(ip);
    }
    if let Some(host) = &args.dns {
        auth = auth.with_dns(host.as_str());
    }

    let output = if args.effective {
        let report: Vec<RightReport> = acl
            .effective_rights(&args.resource, &subject, &auth)
            .into_iter()
            .map(|(right, decision)| RightReport { right, decision })
            .collect();
        serde_json::to_string_pretty(&report)?
    } else {
        let decision = acl.evaluate(&args.resource, args.right, &subject, &auth);
        serde_json::to_string_pretty(&RightReport {
            right: args.right,
            decision,
        })?
    };
    println!("{}", output);
    Ok(())
}
