use nox_infrastructure::config_loader;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
category_id = 987654321
officer_role_id = 11
channel_prefix = "apply"
session_idle_timeout = "45m"
"#,
    )
    .unwrap();

    // Environment variables still win; only assert on values tests do not set.
    let config = config_loader::load_from(&path).expect("Should load config");
    if std::env::var(config_loader::ENV_CATEGORY_ID).is_err() {
        assert_eq!(config.category_id, 987654321);
    }
    if std::env::var(config_loader::ENV_SESSION_IDLE_TIMEOUT).is_err() {
        assert_eq!(config.idle_timeout().unwrap().unwrap().seconds(), 45 * 60);
    }
}

#[test]
fn test_load_from_malformed_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "category_id = [not valid").unwrap();

    let err = config_loader::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse configuration file"));
}

#[test]
fn test_load_from_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = config_loader::load_from(&temp_dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read configuration file"));
}
