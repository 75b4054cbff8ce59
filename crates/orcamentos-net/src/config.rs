//! Client-side backend configuration.

use crate::error::ConfigError;

pub const BACKEND_URL_VAR: &str = "ORCAMENTOS_BACKEND_URL";
pub const BACKEND_KEY_VAR: &str = "ORCAMENTOS_BACKEND_KEY";

/// Where the shared backend lives and the key used to access it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Base URL without a trailing slash.
    pub url: String,
    pub api_key: String,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url));
        }
        Ok(Self {
            url,
            api_key: api_key.into(),
        })
    }

    /// Read `ORCAMENTOS_BACKEND_URL` and `ORCAMENTOS_BACKEND_KEY`. Both are
    /// required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let present = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let url = present(BACKEND_URL_VAR)?;
        let key = present(BACKEND_KEY_VAR)?;
        Self::new(url, key)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn reads_both_variables_and_trims_slash() {
        let config = RemoteConfig::from_lookup(lookup(&[
            (BACKEND_URL_VAR, "https://backend.example.com/"),
            (BACKEND_KEY_VAR, "secret"),
        ]))
        .unwrap();
        assert_eq!(config.url, "https://backend.example.com");
        assert_eq!(config.api_key, "secret");
    }

    #[test]
    fn missing_variables_are_fatal() {
        let err = RemoteConfig::from_lookup(lookup(&[(BACKEND_KEY_VAR, "secret")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(BACKEND_URL_VAR));

        let err = RemoteConfig::from_lookup(lookup(&[
            (BACKEND_URL_VAR, "http://localhost:8080"),
            (BACKEND_KEY_VAR, "  "),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing(BACKEND_KEY_VAR));
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(
            RemoteConfig::new("ftp://x", "k"),
            Err(ConfigError::InvalidUrl(_))
        ));
    }
}
