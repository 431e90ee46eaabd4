use std::collections::HashMap;
use std::path::PathBuf;

use merlin_mongo::config::{AdapterConfig, DEFAULT_DATABASE_URL, load_config};
use merlin_mongo::errors::DbError;
use tempfile::tempdir;

#[test]
fn parses_toml() {
    let cfg = AdapterConfig::from_toml_str(
        r#"
database_url = "mongodb://db.internal:27017/app"
log_dir = "/var/log/merlin"
log_level = "debug"
log_retention = 3
"#,
    )
    .unwrap();
    assert_eq!(cfg.database_url(), "mongodb://db.internal:27017/app");
    assert_eq!(cfg.log_dir, Some(PathBuf::from("/var/log/merlin")));
    assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    assert_eq!(cfg.log_retention, Some(3));
    assert!(matches!(AdapterConfig::from_toml_str("database_url = 3"), Err(DbError::Config(_))));
}

#[test]
fn defaults_to_local_url() {
    let cfg = AdapterConfig::default();
    assert_eq!(cfg.database_url(), DEFAULT_DATABASE_URL);
    let opts = cfg.adapter_options().unwrap();
    assert_eq!(opts.database_url(), DEFAULT_DATABASE_URL);
}

#[test]
fn bad_url_is_rejected_when_building_options() {
    let cfg = AdapterConfig { database_url: Some("redis://localhost".into()), ..AdapterConfig::default() };
    assert!(matches!(cfg.adapter_options(), Err(DbError::InvalidArgument(_))));
}

#[test]
fn merge_keeps_earlier_values() {
    let mut first = AdapterConfig { log_level: Some("warn".into()), ..AdapterConfig::default() };
    first.merge_missing(AdapterConfig {
        database_url: Some("mongodb://second/db".into()),
        log_level: Some("trace".into()),
        ..AdapterConfig::default()
    });
    assert_eq!(first.log_level.as_deref(), Some("warn"));
    assert_eq!(first.database_url(), "mongodb://second/db");
}

#[test]
fn environment_overrides_files() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("MERLIN_MONGO_DATABASE_URL", "mongodb+srv://cluster/app"),
        ("MERLIN_MONGO_LOG_LEVEL", "error"),
        ("MERLIN_MONGO_LOG_RETENTION", "not-a-number"),
    ]);
    let mut cfg = AdapterConfig {
        database_url: Some("mongodb://file/db".into()),
        log_retention: Some(9),
        ..AdapterConfig::default()
    };
    cfg.apply_env_with(|k| env.get(k).map(|v| (*v).to_string()));
    assert_eq!(cfg.database_url(), "mongodb+srv://cluster/app");
    assert_eq!(cfg.log_level.as_deref(), Some("error"));
    assert_eq!(cfg.log_retention, Some(9));
    assert_eq!(cfg.log_dir, None);
}

#[test]
fn load_explicit_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("merlin-mongo.toml");
    std::fs::write(&path, "log_level = \"debug\"\nlog_retention = 2\n").unwrap();
    let cfg = load_config(Some(path.as_path())).unwrap();
    assert_eq!(cfg.log_retention, Some(2));

    let missing = dir.path().join("nope.toml");
    assert!(matches!(load_config(Some(missing.as_path())), Err(DbError::Config(_))));

    let broken = dir.path().join("broken.toml");
    std::fs::write(&broken, "log_level = [").unwrap();
    assert!(matches!(load_config(Some(broken.as_path())), Err(DbError::Config(_))));
}
