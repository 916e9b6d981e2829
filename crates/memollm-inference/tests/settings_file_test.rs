//! Loading settings from disk and applying them to a live registry.

use std::sync::Arc;

use memollm_core::ProviderType;
use memollm_inference::{ConfigManager, LlmService, LlmSettings};

#[test]
fn test_settings_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("llm.toml");
    std::fs::write(
        &path,
        r#"
provider = "openai"

[openai]
api_key = "sk-file-key"
default_model = "gpt-4o"

[ollama]
host = "http://127.0.0.1:11434"
"#,
    )
    .unwrap();

    let settings = LlmSettings::from_file(&path).unwrap();
    let manager = ConfigManager::new(Arc::new(LlmService::new()));
    manager.load_settings(&settings).unwrap();
    assert_eq!(
        manager.service().active_provider_type(),
        Some(ProviderType::OpenAI)
    );

    let out = dir.path().join("saved.toml");
    manager.to_settings().save(&out).unwrap();
    let reloaded = LlmSettings::from_file(&out).unwrap();
    assert_eq!(reloaded.provider, Some(ProviderType::OpenAI));
    assert_eq!(reloaded.openai.unwrap().api_key, "sk-file-key");
    assert_eq!(reloaded.ollama.unwrap().host, "http://127.0.0.1:11434");
}

#[test]
fn test_load_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = LlmSettings::load(Some(&dir.path().join("absent.toml"))).unwrap();
    if std::env::var("GEMINI_API_KEY").is_err() {
        assert!(settings.gemini.is_none());
    }
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "provider = [").unwrap();
    assert!(LlmSettings::from_file(&path).is_err());
}
