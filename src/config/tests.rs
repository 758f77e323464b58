use super::*;
use std::collections::HashMap;
use tempfile::NamedTempFile;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.scanner.max_files, 1000);
    assert_eq!(config.scanner.tree_max_depth, 4);
    assert_eq!(config.context.max_context_lines, 100);
    assert_eq!(config.context.max_upstream_files, 5);
    assert_eq!(config.model.max_retries, 3);
    assert_eq!(
        config.model.models,
        vec!["gemini-2.5-flash-lite", "gemini-2.5-flash"]
    );
    assert!(config.model.api_keys.is_empty());
}

#[test]
fn test_validate_valid_config() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_zero_max_files() {
    let mut config = Config::default();
    config.scanner.max_files = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_empty_models() {
    let mut config = Config::default();
    config.model.models.clear();
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        DeepfixError::Config(ConfigError::InvalidValue { ref key, .. }) if key == "model.models"
    ));
}

#[test]
fn test_validate_zero_retries() {
    let mut config = Config::default();
    config.model.max_retries = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_save_and_load() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let mut config = Config::default();
    config.scanner.max_files = 250;
    config.model.timeout_secs = 30;
    config.model.api_keys = vec!["secret".to_string()];

    config.save(path).unwrap();
    let loaded = Config::from_file(path).unwrap();

    assert_eq!(loaded.scanner.max_files, 250);
    assert_eq!(loaded.model.timeout_secs, 30);
    // Keys never reach the file
    assert!(loaded.model.api_keys.is_empty());
    let raw = std::fs::read_to_string(path).unwrap();
    assert!(!raw.contains("secret"));
}

#[test]
fn test_partial_file_uses_defaults() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "[model]\nmax_retries = 5\n").unwrap();

    let loaded = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(loaded.model.max_retries, 5);
    assert_eq!(loaded.model.timeout_secs, 120);
    assert_eq!(loaded.scanner.max_files, 1000);
}

#[test]
fn test_load_nonexistent_file() {
    let result = Config::from_file(Path::new("/nonexistent/config.toml"));
    assert!(matches!(
        result.unwrap_err(),
        DeepfixError::Config(ConfigError::FileNotFound(_))
    ));
}

#[test]
fn test_load_invalid_toml() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "this is = = not toml").unwrap();
    let result = Config::from_file(temp_file.path());
    assert!(matches!(
        result.unwrap_err(),
        DeepfixError::Config(ConfigError::ParseFailed(_))
    ));
}

#[test]
fn test_apply_env_overrides() {
    // Safety: the variables are unique to this test and removed afterwards
    unsafe {
        std::env::set_var("DEEPFIX_MODELS", "model-a, model-b");
        std::env::set_var("DEEPFIX_MAX_RETRIES", "7");
        std::env::set_var("DEEPFIX_TIMEOUT_SECS", "15");
    }

    let mut config = Config::default();
    config.apply_env_overrides();

    assert_eq!(config.model.models, vec!["model-a", "model-b"]);
    assert_eq!(config.model.max_retries, 7);
    assert_eq!(config.model.timeout_secs, 15);

    unsafe {
        std::env::remove_var("DEEPFIX_MODELS");
        std::env::remove_var("DEEPFIX_MAX_RETRIES");
        std::env::remove_var("DEEPFIX_TIMEOUT_SECS");
    }
}

#[test]
fn test_api_keys_from_list() {
    let keys = api_keys_from(lookup_from(&[("GEMINI_API_KEYS", "a, b ,,c")]));
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn test_api_keys_google_list_fallback() {
    let keys = api_keys_from(lookup_from(&[("GOOGLE_API_KEYS", "g1,g2")]));
    assert_eq!(keys, vec!["g1", "g2"]);
}

#[test]
fn test_api_keys_numbered_slots() {
    let keys = api_keys_from(lookup_from(&[
        ("GEMINI_API_KEY", "k1"),
        ("GOOGLE_API_KEY2", "k2"),
        ("GEMINI_API_KEY4", "k4"),
        ("GEMINI_API_KEY5", "k1"),
    ]));
    assert_eq!(keys, vec!["k1", "k2", "k4"]);
}

#[test]
fn test_api_keys_none() {
    let keys = api_keys_from(lookup_from(&[]));
    assert!(keys.is_empty());
}
