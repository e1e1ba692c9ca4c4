//! Unit tests for configuration and graceful degradation
//!
//! Covers:
//! - Root folder priority order (CLI > env > TOML > compiled default)
//! - TOML parsing with partial files and policy defaults
//! - Rejection of nonsensical policy values
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate WKUNE_ROOT_FOLDER are marked with #[serial].

use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use wkune_common::config::{
    resolve_database_path, resolve_root_folder, TomlConfig, DATABASE_FILE_NAME,
};

const ENV_VAR: &str = "WKUNE_ROOT_FOLDER";

#[test]
#[serial]
fn test_cli_argument_wins_over_everything() {
    env::set_var(ENV_VAR, "/tmp/wkune-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/wkune-toml")),
        ..Default::default()
    };

    let root = resolve_root_folder(Some(Path::new("/tmp/wkune-cli")), ENV_VAR, &toml);
    assert_eq!(root, PathBuf::from("/tmp/wkune-cli"));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_wins_over_toml() {
    env::set_var(ENV_VAR, "/tmp/wkune-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/wkune-toml")),
        ..Default::default()
    };

    let root = resolve_root_folder(None, ENV_VAR, &toml);
    assert_eq!(root, PathBuf::from("/tmp/wkune-env"));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_toml_used_when_no_cli_or_env() {
    env::remove_var(ENV_VAR);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/wkune-toml")),
        ..Default::default()
    };

    let root = resolve_root_folder(None, ENV_VAR, &toml);
    assert_eq!(root, PathBuf::from("/tmp/wkune-toml"));
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var(ENV_VAR, "   ");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/wkune-toml")),
        ..Default::default()
    };

    let root = resolve_root_folder(None, ENV_VAR, &toml);
    assert_eq!(root, PathBuf::from("/tmp/wkune-toml"));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_compiled_default_is_non_empty() {
    env::remove_var(ENV_VAR);
    let root = resolve_root_folder(None, ENV_VAR, &TomlConfig::default());
    assert!(!root.as_os_str().is_empty());
    assert!(root.to_string_lossy().contains("wkune"));
}

#[test]
fn test_database_path_defaults_into_root_folder() {
    let root = PathBuf::from("/tmp/wkune-root");
    let path = resolve_database_path(&root, &TomlConfig::default());
    assert_eq!(path, root.join(DATABASE_FILE_NAME));

    let toml = TomlConfig {
        database_path: Some(PathBuf::from("/srv/wkune/sessions.db")),
        ..Default::default()
    };
    assert_eq!(
        resolve_database_path(&root, &toml),
        PathBuf::from("/srv/wkune/sessions.db")
    );
}

#[test]
fn test_empty_toml_yields_defaults() {
    let config = TomlConfig::from_toml_str("").expect("empty TOML should parse");
    assert!(config.port.is_none());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.policy.auto_ready_timeout_secs, 120);
    assert_eq!(config.policy.creator_presence_secs, 30);
    assert_eq!(config.policy.session_expiry_days, 7);
    assert_eq!(config.policy.event_capacity, 1000);
}

#[test]
fn test_partial_policy_section_keeps_other_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        port = 6000

        [policy]
        auto_ready_timeout_secs = 45
        "#,
    )
    .expect("partial TOML should parse");

    assert_eq!(config.port, Some(6000));
    assert_eq!(config.policy.auto_ready_timeout_secs, 45);
    assert_eq!(config.policy.session_expiry_days, 7);
}

#[test]
fn test_zero_expiry_is_rejected() {
    let result = TomlConfig::from_toml_str(
        r#"
        [policy]
        session_expiry_days = 0
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn test_malformed_toml_is_config_error() {
    let result = TomlConfig::from_toml_str("port = \"not a number\"");
    assert!(matches!(result, Err(wkune_common::Error::Config(_))));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "root_folder = \"/tmp/wkune-file\"\n[logging]\nlevel = \"debug\""
    )
    .expect("write temp config");

    let config = TomlConfig::load_from(file.path()).expect("config should load");
    assert_eq!(config.root_folder, Some(PathBuf::from("/tmp/wkune-file")));
    assert_eq!(config.logging.level, "debug");
}
