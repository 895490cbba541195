//! Model Provider Profiles
//!
//! The closed set of chat-completion providers the pipeline can talk to. Each
//! profile reads its credential bundle from its own environment variables,
//! falling back to documented defaults where one exists.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Unknown LLM mode '{0}' (expected one of: local, groq, gemini)")]
    UnknownMode(String),
    #[error("Missing environment variable: {0}")]
    MissingCredential(&'static str),
}

/// Selects which provider profile a model client is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// An OpenAI-compatible proxy, usually running on the developer's machine.
    Local,
    Groq,
    Gemini,
}

/// The typed credential bundle a model client needs.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

// Keep the key out of logs.
impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

struct EnvProfile {
    api_key_var: &'static str,
    api_key_default: Option<&'static str>,
    base_url_var: &'static str,
    base_url_default: &'static str,
    model_var: &'static str,
    model_default: &'static str,
}

impl ProviderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderMode::Local => "local",
            ProviderMode::Groq => "groq",
            ProviderMode::Gemini => "gemini",
        }
    }

    fn profile(&self) -> EnvProfile {
        match self {
            ProviderMode::Local => EnvProfile {
                api_key_var: "OPENAI_API_KEY",
                api_key_default: Some("my-secret-key"),
                base_url_var: "OPENAI_ENDPOINT",
                base_url_default: "http://localhost:4000",
                model_var: "OPENAI_DEPLOYMENT_NAME",
                model_default: "gpt-4-turbo",
            },
            ProviderMode::Groq => EnvProfile {
                api_key_var: "GROQ_API_KEY",
                api_key_default: None,
                base_url_var: "GROQ_ENDPOINT",
                base_url_default: "https://api.groq.com/openai/v1",
                model_var: "GROQ_MODEL",
                model_default: "llama-3.3-70b-versatile",
            },
            ProviderMode::Gemini => EnvProfile {
                api_key_var: "GEMINI_API_KEY",
                api_key_default: None,
                base_url_var: "GEMINI_ENDPOINT",
                base_url_default: "https://generativelanguage.googleapis.com/v1beta/openai",
                model_var: "GEMINI_MODEL",
                model_default: "gemini-2.0-flash",
            },
        }
    }

    /// Reads this profile's credential bundle from the process environment.
    pub fn credentials_from_env(&self) -> Result<ProviderCredentials, ProviderError> {
        let profile = self.profile();
        let api_key = match std::env::var(profile.api_key_var) {
            Ok(key) => key,
            Err(_) => profile
                .api_key_default
                .ok_or(ProviderError::MissingCredential(profile.api_key_var))?
                .to_string(),
        };
        let base_url = std::env::var(profile.base_url_var)
            .unwrap_or_else(|_| profile.base_url_default.to_string());
        let model =
            std::env::var(profile.model_var).unwrap_or_else(|_| profile.model_default.to_string());

        Ok(ProviderCredentials {
            api_key,
            base_url,
            model,
        })
    }
}

impl FromStr for ProviderMode {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(ProviderMode::Local),
            "groq" => Ok(ProviderMode::Groq),
            "gemini" => Ok(ProviderMode::Gemini),
            other => Err(ProviderError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("local".parse::<ProviderMode>(), Ok(ProviderMode::Local));
        assert_eq!(" GROQ ".parse::<ProviderMode>(), Ok(ProviderMode::Groq));
        assert_eq!("Gemini".parse::<ProviderMode>(), Ok(ProviderMode::Gemini));
        assert_eq!(
            "ollama".parse::<ProviderMode>(),
            Err(ProviderError::UnknownMode("ollama".to_string()))
        );
    }

    #[test]
    fn test_mode_display_round_trips() {
        for mode in [ProviderMode::Local, ProviderMode::Groq, ProviderMode::Gemini] {
            assert_eq!(mode.to_string().parse::<ProviderMode>(), Ok(mode));
        }
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = ProviderCredentials {
            api_key: "sk-very-secret".to_string(),
            base_url: "http://localhost:4000".to_string(),
            model: "gpt-4-turbo".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("gpt-4-turbo"));
    }
}
