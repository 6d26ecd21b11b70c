use irgrade_core::config::HarnessConfig;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_env_overrides_file_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[limits]
index_timeout_secs = 30
search_timeout_secs = 20

[commands]
interpreter = "sh"
"#,
    )
    .unwrap();

    std::env::set_var("IRGRADE_LIMITS__INDEX_TIMEOUT_SECS", "45");
    let config = HarnessConfig::from_file(&path);
    std::env::remove_var("IRGRADE_LIMITS__INDEX_TIMEOUT_SECS");
    let config = config.unwrap();

    // Environment wins over the file, the file wins over defaults
    assert_eq!(config.limits.index_timeout(), Duration::from_secs(45));
    assert_eq!(config.limits.search_timeout(), Duration::from_secs(20));
    assert_eq!(config.commands.interpreter, "sh");
    assert_eq!(config.commands.index_script, "index.sh");
    assert_eq!(config.workspace.index_dir, PathBuf::from("index"));
}

#[test]
fn test_loaded_config_is_valid_after_resolution() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[workspace]\ntemp_dir = \"scratch\"\n").unwrap();

    let config = HarnessConfig::load(Some(&path))
        .unwrap()
        .resolve_paths(dir.path());

    assert!(config.validate().is_ok());
    assert_eq!(config.workspace.temp_dir, dir.path().join("scratch"));
    assert_eq!(
        config.workspace.output_file("2019101001"),
        dir.path().join("output").join("2019101001.txt")
    );
}
