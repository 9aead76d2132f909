//! Seams to the marketplace and to subscribed offerings
//!
//! Discovery, subscription and access are provided by the marketplace; this
//! crate only defines their shape.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::ConsumerConfig;
use crate::error::Result;
use crate::types::{
    AccessParameters, AccessResponse, OfferingId, OfferingQuery, SubscribableOfferingDescription,
};

/// Marketplace session operations
#[async_trait]
pub trait Marketplace: Send + Sync {
    /// Authenticate the consumer with its secret
    async fn authenticate(&self, consumer: &ConsumerConfig, secret: &str) -> Result<()>;

    /// Find candidate offerings for a query
    async fn discover(&self, query: &OfferingQuery) -> Result<Vec<SubscribableOfferingDescription>>;

    /// Subscribe to a discovered offering
    async fn subscribe(&self, description: &SubscribableOfferingDescription) -> Result<Offering>;

    /// Cancel a subscription
    async fn unsubscribe(&self, offering: &Offering) -> Result<()>;

    /// End the consumer session
    async fn terminate(&self) -> Result<()>;
}

/// Access to the data endpoint of a subscribed offering
#[async_trait]
pub trait OfferingAccess: Send + Sync {
    async fn access(&self, offering: &OfferingId, params: &AccessParameters) -> Result<AccessResponse>;
}

/// A subscribed offering
#[derive(Clone)]
pub struct Offering {
    description: SubscribableOfferingDescription,
    access: Arc<dyn OfferingAccess>,
}

impl Offering {
    pub fn new(description: SubscribableOfferingDescription, access: Arc<dyn OfferingAccess>) -> Self {
        Self {
            description,
            access,
        }
    }

    pub fn id(&self) -> &OfferingId {
        &self.description.id
    }

    pub fn description(&self) -> &SubscribableOfferingDescription {
        &self.description
    }

    /// Issue a single access call
    pub async fn access_one_time(&self, params: &AccessParameters) -> Result<AccessResponse> {
        debug!(offering = %self.id(), params = params.len(), "One-time offering access");
        self.access.access(self.id(), params).await
    }
}

impl std::fmt::Debug for Offering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Offering")
            .field("id", &self.description.id)
            .field("name", &self.description.name)
            .finish()
    }
}
