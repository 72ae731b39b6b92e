use std::time::Duration;

use crate::error::{Result, WizardError};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_BASE_ROUTE: &str = "/claim-validator";
pub const CLAIMS_LIST_ROUTE: &str = "/claims";
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Settings for one wizard client.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardConfig {
    /// Root of the claims service, e.g. `http://localhost:8000/api/v1`.
    pub api_url: String,
    /// `None` keeps the HTTP client's default.
    pub request_timeout: Option<Duration>,
    pub page_size: u32,
    /// Prefix of every wizard route.
    pub base_route: String,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: None,
            page_size: DEFAULT_PAGE_SIZE,
            base_route: DEFAULT_BASE_ROUTE.to_string(),
        }
    }
}

impl WizardConfig {
    /// Read `CLAIMS_API_URL`, `CLAIMS_API_TIMEOUT_SECS`, `CLAIMS_PAGE_SIZE`
    /// and `WIZARD_BASE_ROUTE`, keeping defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("CLAIMS_API_URL") {
            config.api_url = url;
        }
        if let Some(secs) = get("CLAIMS_API_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                WizardError::Config(format!("CLAIMS_API_TIMEOUT_SECS must be a number, got '{secs}'"))
            })?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(size) = get("CLAIMS_PAGE_SIZE") {
            config.page_size = size
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    WizardError::Config(format!("CLAIMS_PAGE_SIZE must be a positive number, got '{size}'"))
                })?;
        }
        if let Some(base) = get("WIZARD_BASE_ROUTE") {
            config.base_route = normalize_base_route(&base);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(WizardError::Config(format!(
                "claims API URL must start with http:// or https://, got '{}'",
                self.api_url
            )));
        }
        if self.base_route == CLAIMS_LIST_ROUTE {
            return Err(WizardError::Config(
                "wizard base route cannot be the claims list route".to_string(),
            ));
        }
        Ok(())
    }
}

fn normalize_base_route(raw: &str) -> String {
    format!("/{}", raw.trim_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = WizardConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, WizardConfig::default());
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = WizardConfig::from_lookup(lookup(&[
            ("CLAIMS_API_URL", "https://claims.example.com/api/v1/"),
            ("CLAIMS_API_TIMEOUT_SECS", "30"),
            ("CLAIMS_PAGE_SIZE", "25"),
            ("WIZARD_BASE_ROUTE", "wizard/"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://claims.example.com/api/v1/");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.base_route, "/wizard");
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(WizardConfig::from_lookup(lookup(&[("CLAIMS_API_TIMEOUT_SECS", "soon")])).is_err());
        assert!(WizardConfig::from_lookup(lookup(&[("CLAIMS_PAGE_SIZE", "0")])).is_err());
        assert!(WizardConfig::from_lookup(lookup(&[("CLAIMS_API_URL", "ftp://x")])).is_err());
        assert!(WizardConfig::from_lookup(lookup(&[("WIZARD_BASE_ROUTE", "/claims")])).is_err());
    }
}
