mod email;
mod llm;
mod memory;
mod observability;
mod server;
mod transport;
mod turn;

pub use email::EmailConfig;
pub use llm::{LlmConfig, TokenRatesConfig};
pub use memory::MemoryConfig;
pub use observability::ObservabilityConfig;
pub use server::ServerConfig;
pub use transport::TransportConfig;
pub use turn::TurnConfig;

use serde::{Deserialize, Serialize};

/// The single config blob named in `spec.md` §6, loaded from TOML with
/// environment-variable overrides for secrets (`llm.api_key`,
/// `email.smtp_auth_code`) applied after parsing — same precedence the
/// ancestor gateway uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub token_rates: TokenRatesConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Apply environment-variable overrides for values operators don't want
    /// checked into a config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("LG_LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(code) = std::env::var("LG_SMTP_AUTH_CODE") {
            self.email.smtp_auth_code = Some(code);
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.llm.model.trim().is_empty() {
            return Err("llm.model must not be empty".to_string());
        }
        if self.llm.base_url.trim().is_empty() {
            return Err("llm.base_url must not be empty".to_string());
        }
        if self.turn.max_review_rounds == 0 {
            return Err("turn.max_review_rounds must be >= 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_populated() {
        let cfg = Config::default();
        assert_eq!(cfg.turn.max_review_rounds, 3);
        assert_eq!(cfg.turn.skill_timeout_seconds, 30);
        assert_eq!(cfg.memory.window_seconds, 3600);
        assert_eq!(cfg.transport.subscriber_buffer, 256);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let toml_src = r#"
            [llm]
            api_key = "sk-test"
            model = "gpt-4o-mini"
            base_url = "https://api.openai.com/v1"
        "#;
        let cfg = Config::from_toml_str(toml_src).unwrap();
        assert_eq!(cfg.llm.api_key, "sk-test");
        assert_eq!(cfg.turn.max_review_rounds, 3);
    }

    #[test]
    fn env_override_applies_api_key() {
        std::env::set_var("LG_LLM_API_KEY", "from-env");
        let mut cfg = Config::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.llm.api_key, "from-env");
        std::env::remove_var("LG_LLM_API_KEY");
    }

    #[test]
    fn validate_rejects_zero_rounds() {
        let mut cfg = Config::default();
        cfg.turn.max_review_rounds = 0;
        assert!(cfg.validate().is_err());
    }
}
