use merlin_mongo::logger::{self, AUDIT_TARGET, OPS_TARGET};
use log::LevelFilter;
use tempfile::tempdir;

#[test]
fn parse_level_defaults_to_info() {
    assert_eq!(logger::parse_level(None), LevelFilter::Info);
    assert_eq!(logger::parse_level(Some("DEBUG")), LevelFilter::Debug);
    assert_eq!(logger::parse_level(Some("warn")), LevelFilter::Warn);
    assert_eq!(logger::parse_level(Some("off")), LevelFilter::Off);
    assert_eq!(logger::parse_level(Some("loud")), LevelFilter::Info);
}

// The logger is process-global, so every configure call lives in this one test.
#[test]
fn configure_writes_targeted_files_and_can_be_reconfigured() {
    let first = tempdir().unwrap();
    logger::configure_logging(Some(first.path()), Some("debug"), Some(2)).unwrap();
    log::info!(target: OPS_TARGET, "ops line");
    log::info!(target: AUDIT_TARGET, "audit line");
    log::info!("app line");
    log::logger().flush();

    let read = |dir: &std::path::Path, name: &str| std::fs::read_to_string(dir.join(name)).unwrap_or_default();
    assert!(read(first.path(), "ops.log").contains("ops line"));
    assert!(read(first.path(), "audit.log").contains("audit line"));
    let app = read(first.path(), "app.log");
    assert!(app.contains("app line"));
    assert!(!app.contains("ops line"));

    let second = tempdir().unwrap();
    logger::configure_logging(Some(second.path()), Some("warn"), None).unwrap();
    log::info!(target: OPS_TARGET, "filtered");
    log::warn!(target: OPS_TARGET, "kept");
    log::logger().flush();
    let ops = read(second.path(), "ops.log");
    assert!(ops.contains("kept"));
    assert!(!ops.contains("filtered"));
}
