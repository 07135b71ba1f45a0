use judgebox::{Config, ConfigError, PullPolicy};

use super::FIXTURES_PATH;

fn load(name: &str) -> Result<Config, ConfigError> {
    Config::from_file(format!("{FIXTURES_PATH}/configs/{name}"))
}

#[test]
fn test_load_valid_config() {
    let config = load("valid_full.toml").expect("Failed to load config");

    assert!(config.languages.contains_key("python"));
    assert!(config.languages.contains_key("shell"));
    assert_eq!(config.container_prefix, "jb-test");
    assert_eq!(config.max_concurrent_runs, 4);
    assert_eq!(config.max_code_bytes, 4096);
    assert_eq!(config.pull_policy, PullPolicy::Never);
    assert_eq!(config.default_limits.time_limit, Some(2.0));
    assert_eq!(config.default_limits.wall_time_limit, Some(4.0));
}

#[test]
fn test_load_minimal_config() {
    let config = load("valid_minimal.toml").expect("Failed to load config");

    assert_eq!(config.language_list(), vec![("test", "Test Language")]);
    assert_eq!(config.container_prefix, "judgebox");
    assert_eq!(config.pull_policy, PullPolicy::Missing);
}

#[test]
fn test_language_env_loaded() {
    let config = load("valid_full.toml").expect("Failed to load config");
    let python = config.get_language("python").unwrap();

    assert_eq!(python.run.env.len(), 1);
    let (key, value) = python.run.env.iter().next().unwrap();
    assert!(key.eq_ignore_ascii_case("PYTHONUNBUFFERED"));
    assert_eq!(value, "1");
}

#[test]
fn test_language_limits_layer_over_defaults() {
    let config = load("valid_full.toml").expect("Failed to load config");
    let shell = config.get_language("shell").unwrap();

    let limits = config.effective_limits(shell, None);
    assert_eq!(limits.time_limit, Some(2.0));
    assert_eq!(limits.wall_time_limit, Some(2.0));
    assert_eq!(limits.max_processes, Some(8));
    assert_eq!(limits.memory_limit, Some(131072));
}

#[test]
fn test_source_name_and_command_expansion() {
    let config = load("valid_full.toml").expect("Failed to load config");
    let shell = config.get_language("shell").unwrap();

    assert_eq!(shell.source_name(), "main.sh");
    assert_eq!(shell.run_command(), vec!["sh", "/work/main.sh"]);

    let python = config.get_language("python").unwrap();
    assert_eq!(python.source_name(), "main.py");
}

#[test]
fn test_load_missing_file() {
    let result = load("does_not_exist.toml");
    assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
}

#[test]
fn test_load_invalid_empty_name() {
    assert!(load("invalid_empty_name.toml").is_err());
}

#[test]
fn test_load_invalid_empty_extension() {
    assert!(load("invalid_empty_extension.toml").is_err());
}

#[test]
fn test_load_invalid_empty_run_command() {
    assert!(load("invalid_empty_run_command.toml").is_err());
}

#[test]
fn test_load_invalid_relative_workdir() {
    assert!(matches!(
        load("invalid_relative_workdir.toml"),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_load_invalid_template_without_cases_slot() {
    assert!(matches!(
        load("invalid_missing_cases_slot.toml"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_load_invalid_zero_concurrency() {
    assert!(matches!(
        load("invalid_zero_concurrency.toml"),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_load_invalid_container_prefix() {
    assert!(matches!(
        load("invalid_bad_prefix.toml"),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_example_config_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("judgebox.toml");
    std::fs::write(&path, judgebox::EXAMPLE_CONFIG).unwrap();

    let config = Config::from_file(&path).expect("Failed to load example config");
    let ids: Vec<&str> = config.language_list().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["csharp", "javascript", "python"]);
}
