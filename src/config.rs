//! Process configuration loaded from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `DOCFORGE_DATABASE` | platform data dir, `docforge.db` |
//! | `GEMINI_API_KEY` | unset (fallback mode) |
//! | `DOCFORGE_GEMINI_MODELS` | [`DEFAULT_MODELS`] |
//! | `DOCFORGE_GEMINI_BASE_URL` | Gemini v1beta endpoint |
//! | `DOCFORGE_LLM_TIMEOUT_SECS` | 60 |
//! | `DOCFORGE_JWT_SECRET` | random per process |
//! | `DOCFORGE_TOKEN_TTL_MINUTES` | 60 |
//! | `DOCFORGE_CORS_ORIGINS` | local frontend origins |

use std::path::PathBuf;
use std::time::Duration;

use crate::llm::DEFAULT_GEMINI_BASE_URL;

/// Candidate models, tried in order at startup.
pub const DEFAULT_MODELS: &[&str] = &[
    "models/gemini-flash-latest",
    "models/gemini-2.5-flash",
    "models/gemini-2.0-flash",
];

/// Upper bound for `DOCFORGE_TOKEN_TTL_MINUTES` (one year).
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite path. `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
    pub llm: LlmConfig,
    pub auth: AuthConfig,
    pub cors_origins: Vec<String>,
}

/// Generative backend settings. Only read once, at startup.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub candidate_models: Vec<String>,
    pub base_url: String,
    pub timeout: Duration,
}

/// Token signing settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_path = non_empty(lookup("DOCFORGE_DATABASE")).map(PathBuf::from);

        let candidate_models = non_empty(lookup("DOCFORGE_GEMINI_MODELS"))
            .map(|s| split_list(&s))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| DEFAULT_MODELS.iter().map(|s| s.to_string()).collect());

        let timeout = lookup("DOCFORGE_LLM_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(60);

        let llm = LlmConfig {
            api_key: non_empty(lookup("GEMINI_API_KEY")),
            candidate_models,
            base_url: non_empty(lookup("DOCFORGE_GEMINI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout),
        };

        let jwt_secret = match non_empty(lookup("DOCFORGE_JWT_SECRET")) {
            Some(secret) => secret,
            None => {
                tracing::warn!(
                    "DOCFORGE_JWT_SECRET is not set; tokens will not survive a restart"
                );
                random_secret()
            }
        };

        let token_ttl_minutes = lookup("DOCFORGE_TOKEN_TTL_MINUTES")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|m| *m > 0)
            .map(|m| m.min(MAX_TOKEN_TTL_MINUTES))
            .unwrap_or(60);

        let cors_origins = non_empty(lookup("DOCFORGE_CORS_ORIGINS"))
            .map(|s| split_list(&s))
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect());

        Self {
            database_path,
            llm,
            auth: AuthConfig {
                jwt_secret,
                token_ttl_minutes,
            },
            cors_origins,
        }
    }
}

impl AuthConfig {
    /// Fixed secret for tests.
    pub fn for_testing() -> Self {
        Self {
            jwt_secret: "test-secret".to_string(),
            token_ttl_minutes: 60,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn random_secret() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]);

        assert!(config.database_path.is_none());
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.candidate_models, DEFAULT_MODELS);
        assert_eq!(config.llm.base_url, DEFAULT_GEMINI_BASE_URL);
        assert_eq!(config.llm.timeout, Duration::from_secs(60));
        assert_eq!(config.auth.token_ttl_minutes, 60);
        assert!(!config.auth.jwt_secret.is_empty());
        assert_eq!(config.cors_origins, DEFAULT_CORS_ORIGINS);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = config_from(&[("GEMINI_API_KEY", "  ")]);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn model_list_is_split_and_trimmed() {
        let config = config_from(&[("DOCFORGE_GEMINI_MODELS", " a, ,b ,c")]);
        assert_eq!(config.llm.candidate_models, vec!["a", "b", "c"]);
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[
            ("DOCFORGE_LLM_TIMEOUT_SECS", "soon"),
            ("DOCFORGE_TOKEN_TTL_MINUTES", "-5"),
        ]);
        assert_eq!(config.llm.timeout, Duration::from_secs(60));
        assert_eq!(config.auth.token_ttl_minutes, 60);
    }

    #[test]
    fn token_lifetime_is_capped() {
        let config = config_from(&[(
            "DOCFORGE_TOKEN_TTL_MINUTES",
            "9223372036854775807",
        )]);
        assert_eq!(config.auth.token_ttl_minutes, MAX_TOKEN_TTL_MINUTES);
    }

    #[test]
    fn explicit_values_are_used() {
        let config = config_from(&[
            ("DOCFORGE_DATABASE", "/tmp/docs.db"),
            ("GEMINI_API_KEY", "secret"),
            ("DOCFORGE_JWT_SECRET", "jwt"),
            ("DOCFORGE_CORS_ORIGINS", "https://docs.example.com"),
        ]);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/docs.db")));
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(config.auth.jwt_secret, "jwt");
        assert_eq!(config.cors_origins, vec!["https://docs.example.com"]);
    }
}
