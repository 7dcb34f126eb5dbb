//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::onboarding::model::Language;
use crate::onboarding::parsers::ParserOptions;

/// Orchestrator settings, injected into `OnboardingManager`.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Language used before the user picks one, and for error replies to unknown users.
    pub default_language: Language,
    /// Whether the emergency-contact question accepts "skip".
    pub allow_emergency_skip: bool,
    /// Upper bound on any single store call.
    pub store_timeout: Duration,
    /// Upper bound on one answer-interpreter call.
    pub interpreter_timeout: Duration,
    /// Messages that restart an in-progress onboarding. Compared case-insensitively.
    pub reset_keywords: Vec<String>,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            default_language: Language::English,
            allow_emergency_skip: true,
            store_timeout: Duration::from_secs(5),
            interpreter_timeout: Duration::from_secs(8),
            reset_keywords: vec![
                "restart".to_string(),
                "reset".to_string(),
                "फिर से शुरू".to_string(),
            ],
        }
    }
}

impl OnboardingConfig {
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            allow_emergency_skip: self.allow_emergency_skip,
        }
    }

    /// Whether `text` is exactly one of the reset keywords.
    pub fn is_reset(&self, text: &str) -> bool {
        let text = text.trim().to_lowercase();
        !text.is_empty() && self.reset_keywords.iter().any(|k| k.to_lowercase() == text)
    }
}

/// Settings for the optional Anthropic-backed answer interpreter.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
}

pub const DEFAULT_INTERPRETER_MODEL: &str = "claude-3-5-haiku-latest";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Process-level configuration for the `gluco-sahayak` binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: PathBuf,
    /// Directory for the daily rolling log file. Stdout only when unset.
    pub log_dir: Option<PathBuf>,
    pub onboarding: OnboardingConfig,
    /// `None` when `ANTHROPIC_API_KEY` is unset; answers are then parsed by rules only.
    pub interpreter: Option<InterpreterConfig>,
}

impl AppConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = OnboardingConfig::default();

        let port = parse_or(get("GLUCO_PORT"), "GLUCO_PORT", 8080u16)?;
        let db_path = get("GLUCO_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/gluco-sahayak.db"));
        let log_dir = get("GLUCO_LOG_DIR").map(PathBuf::from);

        let default_language = parse_or(
            get("GLUCO_DEFAULT_LANGUAGE").map(|v| v.to_lowercase()),
            "GLUCO_DEFAULT_LANGUAGE",
            defaults.default_language,
        )?;
        let allow_emergency_skip = match get("GLUCO_ALLOW_EMERGENCY_SKIP") {
            Some(raw) => parse_bool("GLUCO_ALLOW_EMERGENCY_SKIP", &raw)?,
            None => defaults.allow_emergency_skip,
        };
        let store_timeout = match get("GLUCO_STORE_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(positive_ms("GLUCO_STORE_TIMEOUT_MS", &raw)?),
            None => defaults.store_timeout,
        };
        let interpreter_timeout = match get("GLUCO_INTERPRETER_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(positive_ms("GLUCO_INTERPRETER_TIMEOUT_MS", &raw)?),
            None => defaults.interpreter_timeout,
        };

        let interpreter = get("ANTHROPIC_API_KEY").map(|key| InterpreterConfig {
            api_key: SecretString::from(key),
            model: get("GLUCO_INTERPRETER_MODEL")
                .unwrap_or_else(|| DEFAULT_INTERPRETER_MODEL.to_string()),
            base_url: get("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
        });

        Ok(Self {
            port,
            db_path,
            log_dir,
            onboarding: OnboardingConfig {
                default_language,
                allow_emergency_skip,
                store_timeout,
                interpreter_timeout,
                ..defaults
            },
            interpreter,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}' is not a boolean"),
        }),
    }
}

fn positive_ms(key: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}' is not a positive number of milliseconds"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_env_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_path, PathBuf::from("./data/gluco-sahayak.db"));
        assert!(config.log_dir.is_none());
        assert!(config.interpreter.is_none());
        assert_eq!(config.onboarding.default_language, Language::English);
        assert!(config.onboarding.allow_emergency_skip);
        assert_eq!(config.onboarding.store_timeout, Duration::from_secs(5));
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("GLUCO_PORT", "9000"),
            ("GLUCO_DB_PATH", "/tmp/g.db"),
            ("GLUCO_DEFAULT_LANGUAGE", "Hindi"),
            ("GLUCO_ALLOW_EMERGENCY_SKIP", "false"),
            ("GLUCO_STORE_TIMEOUT_MS", "250"),
            ("GLUCO_LOG_DIR", "/var/log/gluco"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.db_path, PathBuf::from("/tmp/g.db"));
        assert_eq!(config.onboarding.default_language, Language::Hindi);
        assert!(!config.onboarding.allow_emergency_skip);
        assert_eq!(config.onboarding.store_timeout, Duration::from_millis(250));
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/gluco")));
    }

    #[test]
    fn api_key_enables_interpreter() {
        let config = config_from(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        let interpreter = config.interpreter.unwrap();
        assert_eq!(interpreter.api_key.expose_secret(), "sk-test");
        assert_eq!(interpreter.model, DEFAULT_INTERPRETER_MODEL);
        assert!(!format!("{interpreter:?}").contains("sk-test"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (key, value) in [
            ("GLUCO_PORT", "eighty"),
            ("GLUCO_DEFAULT_LANGUAGE", "klingon"),
            ("GLUCO_ALLOW_EMERGENCY_SKIP", "maybe"),
            ("GLUCO_STORE_TIMEOUT_MS", "0"),
        ] {
            let err = config_from(&[(key, value)]).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue { key: k, .. } if k == key),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn reset_keywords_match_whole_message() {
        let config = OnboardingConfig::default();
        assert!(config.is_reset("restart"));
        assert!(config.is_reset("  RESET "));
        assert!(config.is_reset("फिर से शुरू"));
        assert!(!config.is_reset("please restart later"));
        assert!(!config.is_reset(""));
    }
}
