//! Configuration and policy files on disk

use dsacl::policy::{Ace, Acl, Comparator, Expr, PolicySource, Right};
use dsacl::{AccessControl, AclConfig, AuthContext, PolicyError, Subject};
use std::fs;
use tempfile::TempDir;

fn write_policy(dir: &TempDir, name: &str, policy: &PolicySource) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, policy.to_json().unwrap()).unwrap();
    path
}

fn admins_only() -> PolicySource {
    PolicySource::new().with_acl(Acl::new("admins").with_entry(Ace::allow(
        "/**",
        Expr::term("group", Comparator::Eq, "admins"),
    )))
}

#[test]
fn test_missing_config_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = AclConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, AclConfig::default());
}

#[test]
fn test_config_file_names_policy_file() {
    let dir = TempDir::new().unwrap();
    let policy_path = write_policy(&dir, "policy.json", &admins_only());
    let config_path = dir.path().join("dsacl.toml");
    fs::write(
        &config_path,
        format!(
            "policy_file = {:?}\n\n[cache]\nshards = 2\n\n[evaluators]\ndisabled = [\"dns\", \"ip\"]\n",
            policy_path.display().to_string()
        ),
    )
    .unwrap();

    let config = AclConfig::load(&config_path).unwrap();
    assert_eq!(config.cache.shards, 2);

    let acl = AccessControl::builder().config(config).build().unwrap();
    assert!(!acl.registry().contains("dns"));
    assert!(!acl.registry().contains("ip"));
    assert_eq!(acl.stats().evaluator_count, 8);

    let admin = Subject::user("uid=root,o=example").with_group("admins");
    assert!(acl
        .evaluate("/anything", Right::Read, &admin, &AuthContext::new())
        .is_allowed());
}

#[test]
fn test_disabled_evaluator_rejects_policy_using_it() {
    let config = AclConfig::from_toml_str("[evaluators]\ndisabled = [\"group\"]\n").unwrap();
    let result = AccessControl::builder()
        .config(config)
        .policy(admins_only())
        .build();
    assert!(matches!(result, Err(PolicyError::InvalidPolicy { .. })));
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[cache]\ndecision_capacity = 0\n").unwrap();
    assert!(matches!(AclConfig::load(&path), Err(PolicyError::Config(_))));

    let mut config = AclConfig::default();
    config.cache.shards = 0;
    assert!(AccessControl::builder().config(config).build().is_err());
}

#[test]
fn test_reload_from_file() {
    let dir = TempDir::new().unwrap();
    let acl = AccessControl::new(PolicySource::new()).unwrap();
    let admin = Subject::user("uid=root,o=example").with_group("admins");
    let auth = AuthContext::new();
    assert!(acl.evaluate("/x", Right::Read, &admin, &auth).is_denied());

    let path = write_policy(&dir, "next.json", &admins_only());
    acl.reload_file(&path).unwrap();
    assert!(acl.evaluate("/x", Right::Read, &admin, &auth).is_allowed());

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{\"acls\": [").unwrap();
    assert!(matches!(
        acl.reload_file(&broken),
        Err(PolicyError::Serialization(_))
    ));
    assert!(matches!(
        acl.reload_file(&dir.path().join("gone.json")),
        Err(PolicyError::Io(_))
    ));
    assert_eq!(acl.stats().reload_count, 1);
}

#[test]
fn test_policy_json_roundtrip_preserves_decisions() {
    let policy = admins_only();
    let parsed = PolicySource::from_json(&policy.to_json().unwrap()).unwrap();
    assert_eq!(parsed, policy);
}
