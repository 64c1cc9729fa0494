//! API authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Bearer tokens accepted on the provisioning endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Comma-separated list of accepted tokens
    #[serde(default)]
    pub api_tokens: Option<String>,
}

impl AuthConfig {
    pub fn tokens(&self) -> Vec<String> {
        self.api_tokens
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Production must configure tokens, and every token must be long enough.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let tokens = self.tokens();
        if tokens.is_empty() && *environment == Environment::Production {
            return Err(ValidationError::NoApiTokens);
        }
        if *environment == Environment::Production && tokens.iter().any(|t| t.len() < 32) {
            return Err(ValidationError::WeakApiToken);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_split_and_trimmed() {
        let config = AuthConfig {
            api_tokens: Some("alpha, beta,,".to_string()),
        };
        assert_eq!(config.tokens(), vec!["alpha", "beta"]);
    }

    #[test]
    fn development_allows_no_tokens() {
        assert!(AuthConfig::default()
            .validate(&Environment::Development)
            .is_ok());
    }

    #[test]
    fn production_requires_strong_tokens() {
        assert_eq!(
            AuthConfig::default().validate(&Environment::Production),
            Err(ValidationError::NoApiTokens)
        );

        let weak = AuthConfig {
            api_tokens: Some("short".to_string()),
        };
        assert_eq!(
            weak.validate(&Environment::Production),
            Err(ValidationError::WeakApiToken)
        );

        let strong = AuthConfig {
            api_tokens: Some("a".repeat(40)),
        };
        assert!(strong.validate(&Environment::Production).is_ok());
    }
}
