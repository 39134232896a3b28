use url::Url;

use crate::error::Error;
use crate::rewrite::RewriteTable;

const DEFAULT_DEVICE_IP_URL: &str = "https://api.ipify.org/";
const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Handshake configuration.
///
/// Nothing is required; every field has a working default.
///
/// ```rust,ignore
/// use carrier_auth::Config;
///
/// let config = Config::new()
///     .with_max_redirects(5)
///     .with_device_ip_url("https://ip.example.com/".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    pub(crate) device_ip_url: Url,
    pub(crate) max_redirects: usize,
    pub(crate) rewrite_table: RewriteTable,
    pub(crate) user_agent: Option<String>,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self {
            device_ip_url: default_device_ip_url(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            rewrite_table: RewriteTable::default(),
            user_agent: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `CARRIER_AUTH_DEVICE_IP_URL`: Override the device IP lookup endpoint
    /// - `CARRIER_AUTH_MAX_REDIRECTS`: Maximum redirects chased during the auth leg
    /// - `CARRIER_AUTH_USER_AGENT`: `User-Agent` sent by the default transport
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::new();

        if let Some(url_str) = lookup("CARRIER_AUTH_DEVICE_IP_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| Error::Config(format!("CARRIER_AUTH_DEVICE_IP_URL: {e}")))?;
            config = config.with_device_ip_url(url);
        }
        if let Some(max) = lookup("CARRIER_AUTH_MAX_REDIRECTS") {
            let max: usize = max
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("CARRIER_AUTH_MAX_REDIRECTS: {e}")))?;
            config = config.with_max_redirects(max);
        }
        if let Some(ua) = lookup("CARRIER_AUTH_USER_AGENT").filter(|ua| !ua.trim().is_empty()) {
            config = config.with_user_agent(ua);
        }

        Ok(config)
    }

    /// Override the device IP lookup endpoint.
    #[must_use]
    pub fn with_device_ip_url(mut self, url: Url) -> Self {
        self.device_ip_url = url;
        self
    }

    /// Override the redirect-chase cap (default: 10).
    #[must_use]
    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Replace the carrier URL rewrite table.
    #[must_use]
    pub fn with_rewrite_table(mut self, table: RewriteTable) -> Self {
        self.rewrite_table = table;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Device IP lookup endpoint.
    #[must_use]
    pub fn device_ip_url(&self) -> &Url {
        &self.device_ip_url
    }

    /// Maximum number of redirects chased during the auth leg.
    #[must_use]
    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    #[must_use]
    pub fn rewrite_table(&self) -> &RewriteTable {
        &self.rewrite_table
    }

    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn default_device_ip_url() -> Url {
    DEFAULT_DEVICE_IP_URL.parse().expect("valid default URL")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::new();
        assert_eq!(config.device_ip_url().as_str(), "https://api.ipify.org/");
        assert_eq!(config.max_redirects(), 10);
        assert_eq!(config.rewrite_table(), &RewriteTable::default());
        assert!(config.user_agent().is_none());
    }

    #[test]
    fn overrides_chain() {
        let config = Config::new()
            .with_device_ip_url("https://ip.example.com/".parse().unwrap())
            .with_max_redirects(3)
            .with_rewrite_table(RewriteTable::empty())
            .with_user_agent("tester");

        assert_eq!(config.device_ip_url().as_str(), "https://ip.example.com/");
        assert_eq!(config.max_redirects(), 3);
        assert!(config.rewrite_table().rules().is_empty());
        assert_eq!(config.user_agent(), Some("tester"));
    }

    #[test]
    fn env_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CARRIER_AUTH_DEVICE_IP_URL", "https://ip.example.com/raw"),
            ("CARRIER_AUTH_MAX_REDIRECTS", " 4 "),
            ("CARRIER_AUTH_USER_AGENT", "carrier-auth/1"),
        ]))
        .unwrap();

        assert_eq!(config.device_ip_url().as_str(), "https://ip.example.com/raw");
        assert_eq!(config.max_redirects(), 4);
        assert_eq!(config.user_agent(), Some("carrier-auth/1"));
    }

    #[test]
    fn env_empty_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.max_redirects(), 10);
    }

    #[test]
    fn env_invalid_url_is_config_error() {
        let err = Config::from_lookup(lookup(&[("CARRIER_AUTH_DEVICE_IP_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.starts_with("CARRIER_AUTH_DEVICE_IP_URL")));
    }

    #[test]
    fn env_invalid_redirects_is_config_error() {
        let err = Config::from_lookup(lookup(&[("CARRIER_AUTH_MAX_REDIRECTS", "many")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
