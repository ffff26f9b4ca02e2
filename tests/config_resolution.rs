//! Layered configuration resolution.

use std::fs;

use apprun::config::{app_env_prefix, ConfigError, ConfigResolver, Environment};

use serde::{Deserialize, Serialize};

mod common;
use common::{DbConfig, TestConfig};

#[test]
fn test_environment_beats_file_beats_base() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yaml"), "timeout: 60\n").unwrap();
    let env = Environment::from_iter([("APP_TIMEOUT", "90")]);

    let resolved = ConfigResolver::new(&env, "svc")
        .with_dir(dir.path())
        .resolve(TestConfig::default())
        .unwrap();

    assert_eq!(resolved.timeout, 90);
}

#[test]
fn test_sources_apply_as_successive_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yaml"), "timeout: 60\ndb:\n  host: yaml-host\n").unwrap();
    fs::write(dir.path().join("config.json"), r#"{"db": {"port": 6000}}"#).unwrap();
    fs::write(dir.path().join("svc.yaml"), "timeout: 70\n").unwrap();
    fs::write(dir.path().join("svc.json"), r#"{"name": "from-app-json"}"#).unwrap();
    let explicit = dir.path().join("override.toml");
    fs::write(&explicit, "verbose = true\n[db]\nhost = \"toml-host\"\n").unwrap();

    let env = Environment::from_iter([
        ("APP_CONFIG_PATH", explicit.to_str().unwrap()),
        ("APP_DB_PORT", "7000"),
    ]);

    let resolved = ConfigResolver::new(&env, "svc")
        .with_dir(dir.path())
        .resolve(TestConfig::default())
        .unwrap();

    assert_eq!(
        resolved,
        TestConfig {
            timeout: 70,
            name: "from-app-json".into(),
            verbose: true,
            db: DbConfig {
                host: "toml-host".into(),
                port: 7000,
            },
        }
    );
}

#[test]
fn test_no_files_uses_base_and_environment() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::from_iter([("APP_NAME", "env-name")]);

    let resolved = ConfigResolver::new(&env, "svc")
        .with_dir(dir.path())
        .resolve(TestConfig::default())
        .unwrap();

    assert_eq!(
        resolved,
        TestConfig {
            name: "env-name".into(),
            ..TestConfig::default()
        }
    );
}

#[test]
fn test_missing_explicit_path_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.yaml");
    let env = Environment::from_iter([("APP_CONFIG_PATH", missing.to_str().unwrap())]);

    let err = ConfigResolver::new(&env, "svc")
        .with_dir(dir.path())
        .resolve(TestConfig::default())
        .unwrap_err();

    assert!(matches!(err, ConfigError::NotFound { .. }));
    assert_eq!(err.path(), Some(missing.as_path()));
}

#[test]
fn test_empty_explicit_path_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::from_iter([("APP_CONFIG_PATH", "")]);

    let resolved = ConfigResolver::new(&env, "svc")
        .with_dir(dir.path())
        .resolve(TestConfig::default())
        .unwrap();
    assert_eq!(resolved, TestConfig::default());
}

#[test]
fn test_malformed_convention_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.json"), "{\"timeout\": ").unwrap();

    let err = ConfigResolver::new(&Environment::default(), "svc")
        .with_dir(dir.path())
        .resolve(TestConfig::default())
        .unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
    assert_eq!(err.path(), Some(dir.path().join("config.json").as_path()));
}

#[test]
fn test_wrongly_typed_file_value_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yaml"), "timeout: soon\n").unwrap();

    let err = ConfigResolver::new(&Environment::default(), "svc")
        .with_dir(dir.path())
        .resolve(TestConfig::default())
        .unwrap_err();

    assert!(matches!(err, ConfigError::Invalid { .. }));
    assert_eq!(err.path(), Some(dir.path().join("config.yaml").as_path()));
}

#[test]
fn test_later_file_does_not_hide_wrongly_typed_earlier_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yaml"), "timeout: soon\n").unwrap();
    fs::write(dir.path().join("svc.yaml"), "timeout: 5\n").unwrap();

    let err = ConfigResolver::new(&Environment::default(), "svc")
        .with_dir(dir.path())
        .resolve(TestConfig::default())
        .unwrap_err();

    assert!(matches!(err, ConfigError::Invalid { .. }));
    assert_eq!(err.path(), Some(dir.path().join("config.yaml").as_path()));
}

#[test]
fn test_wrongly_typed_explicit_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yaml"), "timeout: 60\n").unwrap();
    let explicit = dir.path().join("override.toml");
    fs::write(&explicit, "[db]\nport = \"five\"\n").unwrap();
    let env = Environment::from_iter([("APP_CONFIG_PATH", explicit.to_str().unwrap())]);

    let err = ConfigResolver::new(&env, "svc")
        .with_dir(dir.path())
        .resolve(TestConfig::default())
        .unwrap_err();

    assert!(matches!(err, ConfigError::Invalid { .. }));
    assert_eq!(err.path(), Some(explicit.as_path()));
}

#[test]
fn test_malformed_environment_value_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::from_iter([("APP_DB_PORT", "not-a-port")]);

    let err = ConfigResolver::new(&env, "svc")
        .with_dir(dir.path())
        .resolve(TestConfig::default())
        .unwrap_err();

    match err {
        ConfigError::EnvOverlay { key, .. } => assert_eq!(key, "APP_DB_PORT"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_out_of_range_environment_value_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::from_iter([("APP_DB_PORT", "70000")]);

    let err = ConfigResolver::new(&env, "svc")
        .with_dir(dir.path())
        .resolve(TestConfig::default())
        .unwrap_err();

    match err {
        ConfigError::EnvOverlay { key, .. } => assert_eq!(key, "APP_DB_PORT"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_resolution_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yaml"), "timeout: 60\n").unwrap();
    let env = Environment::from_iter([("APP_DB_HOST", "db.internal")]);
    let resolver = ConfigResolver::new(&env, "svc").with_dir(dir.path());

    let first = resolver.resolve(TestConfig::default()).unwrap();
    let second = resolver.resolve(TestConfig::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_app_derived_env_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::from_iter([
        ("APP_TIMEOUT", "1"),
        ("APP_BILLING_WORKER_TIMEOUT", "2"),
    ]);

    let resolved = ConfigResolver::new(&env, "billing-worker")
        .with_dir(dir.path())
        .with_env_prefix(app_env_prefix("billing-worker"))
        .resolve(TestConfig::default())
        .unwrap();

    assert_eq!(resolved.timeout, 2);
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Credentials {
    user: Option<String>,
    retries: Option<u32>,
}

#[test]
fn test_unset_optional_fields_follow_their_type() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::from_iter([("APP_USER", "12345"), ("APP_RETRIES", "3")]);

    let resolved = ConfigResolver::new(&env, "svc")
        .with_dir(dir.path())
        .resolve(Credentials::default())
        .unwrap();

    assert_eq!(
        resolved,
        Credentials {
            user: Some("12345".into()),
            retries: Some(3),
        }
    );
}

#[test]
fn test_unset_optional_number_rejects_text() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::from_iter([("APP_RETRIES", "many")]);

    let err = ConfigResolver::new(&env, "svc")
        .with_dir(dir.path())
        .resolve(Credentials::default())
        .unwrap_err();

    match err {
        ConfigError::EnvOverlay { key, .. } => assert_eq!(key, "APP_RETRIES"),
        other => panic!("unexpected error: {other}"),
    }
}
