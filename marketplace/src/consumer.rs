//! Consumer session on the marketplace

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ConsumerConfig, ProxyConfig};
use crate::error::Result;
use crate::offering::{Marketplace, Offering};
use crate::types::{OfferingQuery, SubscribableOfferingDescription};

/// Consumer identity bound to a marketplace
pub struct Consumer {
    config: ConsumerConfig,
    marketplace: Arc<dyn Marketplace>,
}

impl Consumer {
    pub fn new(config: ConsumerConfig, marketplace: Arc<dyn Marketplace>) -> Self {
        Self {
            config,
            marketplace,
        }
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Route outbound traffic through a proxy. Replaces any previous proxy,
    /// keeping its bypass list.
    pub fn set_proxy<S: Into<String>>(&mut self, host: S, port: u16) {
        let mut proxy = ProxyConfig::new(host, port);
        if let Some(previous) = self.config.proxy.take() {
            proxy.bypass = previous.bypass;
        }
        info!(proxy = %proxy.proxy_url(), "Proxy configured");
        self.config.proxy = Some(proxy);
    }

    /// Reach `host` directly even when a proxy is set
    pub fn add_proxy_bypass<S: Into<String>>(&mut self, host: S) {
        let host = host.into();
        match self.config.proxy.as_mut() {
            Some(proxy) => {
                if !proxy.should_bypass(&host) {
                    proxy.bypass.push(host);
                }
            }
            None => warn!(host = %host, "Proxy bypass ignored, no proxy configured"),
        }
    }

    pub async fn authenticate(&self, secret: &str) -> Result<()> {
        self.marketplace.authenticate(&self.config, secret).await?;
        info!(consumer = %self.config.consumer_id, "Consumer authenticated");
        Ok(())
    }

    pub async fn discover(&self, query: &OfferingQuery) -> Result<Vec<SubscribableOfferingDescription>> {
        query.validate()?;
        let offerings = self.marketplace.discover(query).await?;
        info!(query = %query.name, found = offerings.len(), "Offering discovery finished");
        Ok(offerings)
    }

    pub async fn subscribe(&self, description: &SubscribableOfferingDescription) -> Result<Offering> {
        let offering = self.marketplace.subscribe(description).await?;
        info!(offering = %offering.id(), "Subscribed to offering");
        Ok(offering)
    }

    pub async fn unsubscribe(&self, offering: &Offering) -> Result<()> {
        self.marketplace.unsubscribe(offering).await?;
        info!(offering = %offering.id(), "Unsubscribed from offering");
        Ok(())
    }

    /// Terminate the session on the marketplace
    pub async fn terminate(self) -> Result<()> {
        self.marketplace.terminate().await?;
        info!(consumer = %self.config.consumer_id, "Consumer session terminated");
        Ok(())
    }
}
