//! Tests for the config module

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::tempdir;

use super::loader::with_env_overrides;
use super::types::*;
use crate::error::ErrorKind;

fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

#[test]
fn test_config_default() {
    let config = RepositoryConfig::default();

    assert!(config.storage.domains_root.is_none());
    assert_eq!(config.sync.interval_secs, 0);
    assert_eq!(config.sync.shutdown_timeout_secs, 10);
    assert!(config.sync.interval().is_none());
    assert!(!config.service.pdp_only);
    assert!(!config.service.enable_json_profile);
}

#[test]
fn test_config_parse_toml() {
    let toml = r#"
[storage]
domains_root = "/var/lib/pap/domains"
domain_template = "/etc/pap/domain-template"

[sync]
interval_secs = 30

[service]
enable_json_profile = true
"#;

    let config: RepositoryConfig = toml::from_str(toml).unwrap();
    assert_eq!(
        config.storage.domains_root,
        Some(PathBuf::from("/var/lib/pap/domains"))
    );
    assert_eq!(config.sync.interval(), Some(Duration::from_secs(30)));
    assert_eq!(config.sync.shutdown_timeout_secs, 10);
    assert!(config.service.enable_json_profile);
    assert!(!config.service.pdp_only);
}

#[test]
fn test_negative_interval_disables_sync() {
    let config: RepositoryConfig = toml::from_str("[sync]\ninterval_secs = -1\n").unwrap();
    assert!(config.sync.interval().is_none());
}

#[test]
fn test_settings_require_paths() {
    let err = RepositoryConfig::default().settings().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.to_string().contains("domains_root"));
}

#[test]
fn test_settings_carry_service_and_sync() {
    let toml = r#"
[storage]
domains_root = "domains"
domain_template = "template"

[sync]
interval_secs = 5
shutdown_timeout_secs = 3

[service]
pdp_only = true
"#;
    let settings = toml::from_str::<RepositoryConfig>(toml)
        .unwrap()
        .settings()
        .unwrap();
    assert_eq!(settings.domains_root, PathBuf::from("domains"));
    assert_eq!(settings.sync_interval, Some(Duration::from_secs(5)));
    assert_eq!(settings.shutdown_timeout, Duration::from_secs(3));
    assert!(settings.pdp_only);
}

#[test]
fn test_settings_reject_template_equal_to_root() {
    let toml = r#"
[storage]
domains_root = "same"
domain_template = "same"
"#;
    let err = toml::from_str::<RepositoryConfig>(toml)
        .unwrap()
        .settings()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_env_overrides() {
    let config = with_env_overrides(
        RepositoryConfig::default(),
        env(&[
            ("PAP_DOMAINS_ROOT", "/data/domains"),
            ("PAP_DOMAIN_TEMPLATE", "/data/template"),
            ("PAP_SYNC_INTERVAL_SECS", "15"),
            ("PAP_PDP_ONLY", "true"),
            ("PAP_ENABLE_JSON_PROFILE", "1"),
        ]),
    );
    assert_eq!(
        config.storage.domains_root,
        Some(PathBuf::from("/data/domains"))
    );
    assert_eq!(
        config.storage.domain_template,
        Some(PathBuf::from("/data/template"))
    );
    assert_eq!(config.sync.interval_secs, 15);
    assert!(config.service.pdp_only);
    assert!(config.service.enable_json_profile);
}

#[test]
fn test_invalid_env_values_are_ignored() {
    let mut base = RepositoryConfig::default();
    base.sync.interval_secs = 7;
    let config = with_env_overrides(
        base,
        env(&[("PAP_SYNC_INTERVAL_SECS", "soon"), ("PAP_PDP_ONLY", "maybe")]),
    );
    assert_eq!(config.sync.interval_secs, 7);
    assert!(!config.service.pdp_only);
}

#[test]
fn test_config_load_with_warnings_reports_unknown_key_with_suggestion() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    fs::write(&path, "[sync]\nintervl_secs = 1\n").unwrap();

    let (_config, warnings) = RepositoryConfig::load_with_warnings(&path).unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].key, "intervl_secs");
    assert_eq!(warnings[0].line, Some(2));
    assert_eq!(warnings[0].suggestion, Some("interval_secs".to_string()));
    assert!(warnings[0].to_string().contains("did you mean 'interval_secs'"));
}

#[test]
fn test_config_load_rejects_wrong_types() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[service]\npdp_only = \"yes\"\n").unwrap();

    let err = RepositoryConfig::load(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageIo);
}

#[test]
fn test_load_or_default_reads_explicit_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[sync]\nshutdown_timeout_secs = 42\n").unwrap();

    let config = RepositoryConfig::load_or_default(Some(&path));
    assert_eq!(config.sync.shutdown_timeout_secs, 42);
}
