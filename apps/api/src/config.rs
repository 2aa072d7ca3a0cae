use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::ai_client::AiSettings;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_transcription_model: String,
    pub ai_max_tokens: u32,
    pub ai_temperature: f32,
    pub ai_timeout_seconds: u64,
    pub ai_max_retries: u32,
    pub ai_retry_base_delay_ms: u64,
    pub ai_cache_ttl_seconds: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        let defaults = AiSettings::default();

        Ok(Config {
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            openai_transcription_model: std::env::var("OPENAI_TRANSCRIPTION_MODEL")
                .unwrap_or(defaults.transcription_model),
            ai_max_tokens: parse_env("AI_MAX_TOKENS", defaults.max_tokens)?,
            ai_temperature: parse_env("AI_TEMPERATURE", defaults.temperature)?,
            ai_timeout_seconds: parse_env("AI_TIMEOUT_SECONDS", 30)?,
            ai_max_retries: parse_env("AI_MAX_RETRIES", defaults.max_retries)?,
            ai_retry_base_delay_ms: parse_env(
                "AI_RETRY_BASE_DELAY_MS",
                defaults.retry_base_delay.as_millis() as u64,
            )?,
            ai_cache_ttl_seconds: parse_env("AI_CACHE_TTL_SECONDS", defaults.cache_ttl.as_secs())?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_seconds)
    }

    /// Orchestration settings derived from the environment.
    pub fn ai_settings(&self) -> AiSettings {
        AiSettings {
            model: self.openai_model.clone(),
            max_tokens: self.ai_max_tokens,
            temperature: self.ai_temperature,
            max_retries: self.ai_max_retries,
            retry_base_delay: Duration::from_millis(self.ai_retry_base_delay_ms),
            cache_ttl: Duration::from_secs(self.ai_cache_ttl_seconds),
            transcription_model: self.openai_transcription_model.clone(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let value: u32 = parse_env("RESUME_API_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("RESUME_API_TEST_BAD_NUMBER", "ten");
        let result: Result<u16> = parse_env("RESUME_API_TEST_BAD_NUMBER", 8080);
        assert!(result.is_err());
    }

    #[test]
    fn test_ai_settings_carry_durations() {
        let config = Config {
            openai_api_key: "sk-test".to_string(),
            openai_base_url: "http://localhost".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_transcription_model: "whisper-1".to_string(),
            ai_max_tokens: 2000,
            ai_temperature: 0.7,
            ai_timeout_seconds: 30,
            ai_max_retries: 2,
            ai_retry_base_delay_ms: 1500,
            ai_cache_ttl_seconds: 600,
            port: 8080,
            rust_log: "info".to_string(),
        };
        let settings = config.ai_settings();
        assert_eq!(settings.retry_base_delay, Duration::from_millis(1500));
        assert_eq!(settings.cache_ttl, Duration::from_secs(600));
        assert_eq!(settings.transcription_model, "whisper-1");
        assert_eq!(config.ai_timeout(), Duration::from_secs(30));
    }
}
