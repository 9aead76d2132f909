//! Configuration of a marketplace consumer session

use config::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Identity and connectivity of a marketplace consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Consumer identifier registered on the marketplace
    pub consumer_id: String,

    /// Base URI of the marketplace
    pub marketplace_uri: String,

    /// Outbound proxy, if the consumer sits behind one
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

/// HTTP proxy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,

    /// Hosts reached directly, bypassing the proxy
    #[serde(default)]
    pub bypass: Vec<String>,
}

impl ProxyConfig {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            bypass: Vec::new(),
        }
    }

    /// Proxy address in `http://host:port` form
    pub fn proxy_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Whether requests to `host` go around the proxy
    pub fn should_bypass(&self, host: &str) -> bool {
        self.bypass.iter().any(|b| b.eq_ignore_ascii_case(host))
    }
}

impl ConsumerConfig {
    pub fn new<I: Into<String>, U: Into<String>>(consumer_id: I, marketplace_uri: U) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            marketplace_uri: marketplace_uri.into(),
            proxy: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.consumer_id.trim().is_empty() {
            return Err(ConfigError::Message("consumer_id cannot be empty".into()));
        }

        if Url::parse(&self.marketplace_uri).is_err() {
            return Err(ConfigError::Message(format!(
                "Invalid marketplace URI: {}",
                self.marketplace_uri
            )));
        }

        if let Some(proxy) = &self.proxy {
            if proxy.host.trim().is_empty() || proxy.port == 0 {
                return Err(ConfigError::Message(format!(
                    "Invalid proxy address: {}:{}",
                    proxy.host, proxy.port
                )));
            }
        }

        Ok(())
    }

    /// Host part of the marketplace URI
    pub fn marketplace_host(&self) -> Option<String> {
        Url::parse(&self.marketplace_uri)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            consumer_id: "Null_Island-Parking_App".to_string(),
            marketplace_uri: "https://market.big-iot.org".to_string(),
            proxy: None,
        }
    }
}
