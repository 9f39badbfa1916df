//! Configuration loading and root resolution tests
//!
//! Tests that manipulate EARSHOT_* environment variables are marked #[serial]
//! so they do not race each other.

use earshot_common::config::{StorageRoots, TomlConfig, CACHE_ENV, DOCUMENTS_ENV};
use earshot_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_load_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        cache_dir = "/tmp/earshot-cache"

        [player]
        tick_interval_ms = 250
        recents_capacity = 5

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/earshot-cache")));
    assert_eq!(config.player.tick_interval_ms, 250);
    assert_eq!(config.player.recents_capacity, 5);
    assert_eq!(config.player.skip_interval_secs, 15);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_malformed_config_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "documents_dir = [unterminated").unwrap();

    match TomlConfig::load(&path) {
        Err(Error::Config(msg)) => assert!(msg.contains("parse")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_explicit_missing_config_is_error() {
    let dir = TempDir::new().unwrap();
    let result = TomlConfig::load_or_default(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(DOCUMENTS_ENV, "/tmp/earshot-env-docs");
    let config = TomlConfig {
        documents_dir: Some(PathBuf::from("/tmp/earshot-config-docs")),
        ..Default::default()
    };

    let roots = StorageRoots::resolve(Some(Path::new("/tmp/earshot-cli-docs")), &config);
    assert_eq!(roots.documents, PathBuf::from("/tmp/earshot-cli-docs"));

    env::remove_var(DOCUMENTS_ENV);
}

#[test]
#[serial]
fn test_env_var_beats_config_file() {
    env::set_var(DOCUMENTS_ENV, "/tmp/earshot-env-docs");
    env::set_var(CACHE_ENV, "/tmp/earshot-env-cache");
    let config = TomlConfig {
        documents_dir: Some(PathBuf::from("/tmp/earshot-config-docs")),
        cache_dir: Some(PathBuf::from("/tmp/earshot-config-cache")),
        ..Default::default()
    };

    let roots = StorageRoots::resolve(None, &config);
    assert_eq!(roots.documents, PathBuf::from("/tmp/earshot-env-docs"));
    assert_eq!(roots.cache, PathBuf::from("/tmp/earshot-env-cache"));

    env::remove_var(DOCUMENTS_ENV);
    env::remove_var(CACHE_ENV);
}

#[test]
#[serial]
fn test_config_file_beats_default() {
    env::remove_var(DOCUMENTS_ENV);
    env::remove_var(CACHE_ENV);
    let config = TomlConfig {
        documents_dir: Some(PathBuf::from("/tmp/earshot-config-docs")),
        filesystem_root: Some(PathBuf::from("/srv")),
        ..Default::default()
    };

    let roots = StorageRoots::resolve(None, &config);
    assert_eq!(roots.documents, PathBuf::from("/tmp/earshot-config-docs"));
    assert_eq!(roots.filesystem, PathBuf::from("/srv"));
    assert!(!roots.cache.as_os_str().is_empty());
}

#[test]
#[serial]
fn test_defaults_when_nothing_set() {
    env::remove_var(DOCUMENTS_ENV);
    env::remove_var(CACHE_ENV);

    let roots = StorageRoots::resolve(None, &TomlConfig::default());
    assert!(roots.documents.ends_with("Documents"));
    assert_eq!(roots.filesystem, PathBuf::from("/"));
}
