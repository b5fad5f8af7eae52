#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use rphotopunch::config::Config;
use rphotopunch::db::DbPool;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn rpp() -> Command {
    cargo_bin_cmd!("rphotopunch")
}

/// Scratch folder with its own config file, database and watched folder.
pub struct TestEnv {
    pub root: TempDir,
    pub config: PathBuf,
    pub db: PathBuf,
    pub watch: PathBuf,
    pub uploads: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let watch = root.path().join("photos");
        let uploads = root.path().join("uploads");
        let db = root.path().join("test.sqlite");
        let config = root.path().join("rphotopunch.conf");

        fs::create_dir_all(&watch).expect("watch dir");

        let cfg = Config {
            database: db.to_string_lossy().to_string(),
            watch_dir: watch.to_string_lossy().to_string(),
            uploads_dir: uploads.to_string_lossy().to_string(),
            ..Config::default()
        };
        cfg.save_to(&config).expect("write config");

        Self {
            root,
            config,
            db,
            watch,
            uploads,
        }
    }

    pub fn config_arg(&self) -> String {
        self.config.to_string_lossy().to_string()
    }

    /// `rphotopunch --config <cfg> <args...>`
    pub fn cmd(&self, args: &[&str]) -> Command {
        let mut c = rpp();
        c.arg("--config").arg(&self.config).args(args);
        c
    }

    pub fn photo(&self, name: &str) -> PathBuf {
        touch(&self.watch, name)
    }

    pub fn out(&self, name: &str) -> String {
        self.root.path().join(name).to_string_lossy().to_string()
    }
}

/// Create a small fake photo named `name` inside `dir`.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let p = dir.join(name);
    fs::write(&p, b"\xFF\xD8\xFF\xE0fake-jpeg").expect("write photo");
    p
}

/// File-backed database in its own temp folder.
pub fn temp_pool() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("store.sqlite");
    let pool = DbPool::open(&path.to_string_lossy()).expect("open db");
    (dir, pool)
}
