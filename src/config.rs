// src/config.rs
use crate::errors::StitchyError;
use std::str::FromStr;

/// Vendor used for image analysis and pattern writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
}

impl FromStr for LlmProvider {
    type Err = StitchyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "anthropic" => Ok(LlmProvider::Anthropic),
            other => Err(StitchyError::Config(format!("Invalid provider: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub redis_url: String,
    pub openai_api_key: String,
    pub anthropic_api_key: Option<String>,
    pub text_provider: LlmProvider,
    pub max_image_dimension: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, StitchyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, StitchyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| StitchyError::Config("OPENAI_API_KEY must be set".to_string()))?;
        let anthropic_api_key = get("ANTHROPIC_API_KEY");

        let text_provider = match get("STITCHY_TEXT_PROVIDER") {
            Some(value) => value.parse()?,
            None => LlmProvider::OpenAi,
        };
        if text_provider == LlmProvider::Anthropic && anthropic_api_key.is_none() {
            return Err(StitchyError::Config(
                "ANTHROPIC_API_KEY must be set when STITCHY_TEXT_PROVIDER=anthropic".to_string(),
            ));
        }

        let max_image_dimension = match get("STITCHY_MAX_IMAGE_DIMENSION") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|d| *d > 0)
                .ok_or_else(|| {
                    StitchyError::Config(format!("Invalid STITCHY_MAX_IMAGE_DIMENSION: {}", value))
                })?,
            None => 2048,
        };

        Ok(Self {
            bind_addr: get("STITCHY_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            redis_url: get("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            openai_api_key,
            anthropic_api_key,
            text_provider,
            max_image_dimension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, StitchyError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(cfg.text_provider, LlmProvider::OpenAi);
        assert_eq!(cfg.max_image_dimension, 2048);
    }

    #[test]
    fn openai_key_is_required() {
        assert!(matches!(config(&[]), Err(StitchyError::Config(_))));
    }

    #[test]
    fn anthropic_provider_needs_its_key() {
        let err = config(&[("OPENAI_API_KEY", "sk"), ("STITCHY_TEXT_PROVIDER", "anthropic")]);
        assert!(err.is_err());

        let cfg = config(&[
            ("OPENAI_API_KEY", "sk"),
            ("ANTHROPIC_API_KEY", "ak"),
            ("STITCHY_TEXT_PROVIDER", "Anthropic"),
        ])
        .unwrap();
        assert_eq!(cfg.text_provider, LlmProvider::Anthropic);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("OPENAI_API_KEY", "sk"), ("STITCHY_TEXT_PROVIDER", "gemini")]).is_err());
        assert!(config(&[("OPENAI_API_KEY", "sk"), ("STITCHY_MAX_IMAGE_DIMENSION", "0")]).is_err());
        assert!(config(&[("OPENAI_API_KEY", "sk"), ("STITCHY_MAX_IMAGE_DIMENSION", "big")]).is_err());
    }
}
