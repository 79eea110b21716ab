use super::*;

#[test]
fn default_config_has_sane_concurrency() {
    let config = Config::default();
    assert_eq!(config.llm_concurrency, 5);
    assert_eq!(config.worker_concurrency, 3);
    assert_eq!(config.stale_lock_secs, 30);
}

#[test]
fn load_missing_file_returns_defaults() {
    let config = Config::load("/nonexistent/path/config.toml").unwrap_or_else(|_| Config::default());
    assert_eq!(config.llm_binary, "claude");
}

#[test]
fn derived_paths_are_rooted_under_data_root() {
    let mut config = Config::default();
    config.data_root = PathBuf::from("/tmp/cah-test");
    assert_eq!(config.tasks_dir(), PathBuf::from("/tmp/cah-test/tasks"));
    assert_eq!(config.queue_path(), PathBuf::from("/tmp/cah-test/queue.json"));
}
