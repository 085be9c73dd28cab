//! Integration tests for the layered configuration

use super::test_utils::with_xdg_env;
use std::fs;
use std::path::PathBuf;
use strata::config::{global_config_path, CachePolicy, ConfigLoader};
use strata::EngineError;
use tempfile::TempDir;

#[cfg(target_os = "linux")]
#[test]
fn test_global_file_then_explicit_file_then_env() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let global = global_config_path().unwrap();
        assert!(global.starts_with(test_dir.path().join("config")));
        fs::create_dir_all(global.parent().unwrap()).unwrap();
        fs::write(
            &global,
            r#"
[snapshot]
ignore = ["target"]
threads = 2
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(None).unwrap();
        assert_eq!(config.snapshot.ignore, vec!["target"]);
        assert_eq!(config.snapshot.threads, 2);
        assert_eq!(
            config.store.path,
            test_dir.path().join("data").join("strata").join("store")
        );

        let explicit = test_dir.path().join("override.toml");
        fs::write(&explicit, "[snapshot]\nthreads = 6\ncache = \"rehash\"\n").unwrap();
        let config = ConfigLoader::load(Some(&explicit)).unwrap();
        assert_eq!(config.snapshot.ignore, vec!["target"]);
        assert_eq!(config.snapshot.threads, 6);
        assert_eq!(config.snapshot.cache, CachePolicy::Rehash);

        std::env::set_var("STRATA__SNAPSHOT__THREADS", "3");
        std::env::set_var("STRATA__STORE__PATH", "/srv/strata");
        let config = ConfigLoader::load(Some(&explicit));
        std::env::remove_var("STRATA__SNAPSHOT__THREADS");
        std::env::remove_var("STRATA__STORE__PATH");
        let config = config.unwrap();
        assert_eq!(config.snapshot.threads, 3);
        assert_eq!(config.store.path, PathBuf::from("/srv/strata"));
    });
}

#[test]
fn test_invalid_config_is_rejected() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let explicit = test_dir.path().join("bad.toml");
        fs::write(&explicit, "[logging]\nlevel = \"chatty\"\n").unwrap();
        match ConfigLoader::load(Some(&explicit)) {
            Err(EngineError::Config(msg)) => assert!(msg.contains("chatty")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }

        fs::write(&explicit, "[snapshot]\ncache = \"sometimes\"\n").unwrap();
        assert!(matches!(
            ConfigLoader::load(Some(&explicit)),
            Err(EngineError::Config(_))
        ));
    });
}
