use rphotopunch::config::migrate::fill_missing_keys;
use rphotopunch::config::{Config, MIN_QUIESCENCE_MS};
use rphotopunch::errors::AppError;
use rphotopunch::watcher::WatcherSettings;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[test]
fn defaults_are_valid() {
    let cfg = Config::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.attachment_limit, 500);
    assert!(cfg.quiescence_ms >= MIN_QUIESCENCE_MS);
}

#[test]
fn quiescence_has_a_floor() {
    let cfg = Config {
        quiescence_ms: MIN_QUIESCENCE_MS - 1,
        ..Config::default()
    };
    assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
}

#[test]
fn bad_ignore_pattern_is_a_config_error() {
    let cfg = Config {
        ignore_patterns: vec!["([unclosed".into()],
        ..Config::default()
    };
    assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    assert!(WatcherSettings::from_config(&cfg).is_err());
}

#[test]
fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::load_from(&dir.path().join("nope.conf")).unwrap();
    assert_eq!(cfg.bind, Config::default().bind);
}

#[test]
fn partial_file_keeps_defaults_for_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.conf");
    fs::write(&path, "attachment_limit: 800\nuse_polling: true\n").unwrap();

    let cfg = Config::load_from(&path).unwrap();
    assert_eq!(cfg.attachment_limit, 800);
    assert!(cfg.use_polling);
    assert_eq!(cfg.quiescence_ms, Config::default().quiescence_ms);
}

#[test]
fn malformed_yaml_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.conf");
    fs::write(&path, "attachment_limit: [1, 2\n").unwrap();
    assert!(matches!(Config::load_from(&path), Err(AppError::ConfigParse(_))));
}

#[test]
fn save_then_load_keeps_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/rphotopunch.conf");
    let cfg = Config {
        watch_dir: "/srv/photos".into(),
        max_parallel_keys: 3,
        ..Config::default()
    };
    cfg.save_to(&path).unwrap();

    let back = Config::load_from(&path).unwrap();
    assert_eq!(back.watch_dir, "/srv/photos");
    assert_eq!(back.max_parallel_keys, 3);
}

#[test]
fn migrate_adds_only_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.conf");
    fs::write(&path, "watch_dir: /mnt/camera\nquiescence_ms: 5000\n").unwrap();

    let added = fill_missing_keys(&path).unwrap();
    assert!(added.contains(&"attachment_limit".to_string()));
    assert!(!added.contains(&"watch_dir".to_string()));

    let cfg = Config::load_from(&path).unwrap();
    assert_eq!(cfg.watch_dir, "/mnt/camera");
    assert_eq!(cfg.quiescence_ms, 5000);

    // second run: nothing left to add
    assert!(fill_missing_keys(&path).unwrap().is_empty());
}

#[test]
fn migrate_ignores_a_missing_file() {
    assert!(fill_missing_keys(Path::new("/definitely/not/here.conf")).unwrap().is_empty());
}

#[test]
fn watcher_settings_follow_the_config() {
    let cfg = Config {
        watch_dir: "/srv/photos".into(),
        quiescence_ms: 1500,
        process_backlog: false,
        ..Config::default()
    };
    let s = WatcherSettings::from_config(&cfg).unwrap();
    assert_eq!(s.quiescence, Duration::from_millis(1500));
    assert!(!s.emit_backlog);
    assert!(s.is_ignored(Path::new("/srv/photos/DumpStack.log.tmp")));
    assert!(!s.is_ignored(Path::new("/srv/photos/Ana_Galpao_2024.01.02.07.00.00.jpg")));
}
