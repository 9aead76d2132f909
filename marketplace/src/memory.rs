//! In-process marketplace
//!
//! Holds registered offerings with scripted responders and enforces the
//! session rules of the real marketplace: authentication before discovery,
//! subscription and activation before access.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ConsumerConfig;
use crate::error::{MarketplaceError, Result};
use crate::offering::{Marketplace, Offering, OfferingAccess};
use crate::types::{
    AccessParameters, AccessResponse, OfferingId, OfferingQuery, SubscribableOfferingDescription,
};

/// Produces the response body of an offering for a set of access parameters
pub type Responder = Arc<dyn Fn(&AccessParameters) -> Result<String> + Send + Sync>;

struct Listing {
    description: SubscribableOfferingDescription,
    responder: Responder,
    access_count: u64,
}

#[derive(Default)]
struct SessionState {
    authenticated: Option<String>,
    terminated: bool,
    subscriptions: HashSet<OfferingId>,
}

#[derive(Default)]
struct Inner {
    secrets: RwLock<HashMap<String, String>>,
    listings: RwLock<HashMap<OfferingId, Listing>>,
    session: RwLock<SessionState>,
}

/// Marketplace living entirely in memory
#[derive(Clone, Default)]
pub struct InMemoryMarketplace {
    inner: Arc<Inner>,
}

impl InMemoryMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer id with its secret
    pub fn register_consumer<I: Into<String>, S: Into<String>>(&self, consumer_id: I, secret: S) {
        self.inner
            .secrets
            .write()
            .insert(consumer_id.into(), secret.into());
    }

    /// Publish an offering answering through `responder`
    pub fn register_offering(&self, description: SubscribableOfferingDescription, responder: Responder) {
        debug!(offering = %description.id, "Offering registered");
        self.inner.listings.write().insert(
            description.id.clone(),
            Listing {
                description,
                responder,
                access_count: 0,
            },
        );
    }

    /// Publish an offering that always answers with the same body
    pub fn register_static<S: Into<String>>(&self, description: SubscribableOfferingDescription, body: S) {
        let body = body.into();
        let responder: Responder =
            Arc::new(move |_: &AccessParameters| -> Result<String> { Ok(body.clone()) });
        self.register_offering(description, responder);
    }

    /// Activate or deactivate an offering
    pub fn set_activated(&self, offering: &OfferingId, activated: bool) -> Result<()> {
        let mut listings = self.inner.listings.write();
        let listing = listings
            .get_mut(offering)
            .ok_or_else(|| MarketplaceError::UnknownOffering {
                offering: offering.to_string(),
            })?;
        listing.description.activated = activated;
        Ok(())
    }

    /// Number of access calls served for an offering
    pub fn access_count(&self, offering: &OfferingId) -> u64 {
        self.inner
            .listings
            .read()
            .get(offering)
            .map(|l| l.access_count)
            .unwrap_or(0)
    }

    pub fn is_subscribed(&self, offering: &OfferingId) -> bool {
        self.inner.session.read().subscriptions.contains(offering)
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.session.read().terminated
    }

    fn ensure_authenticated(&self) -> Result<()> {
        let session = self.inner.session.read();
        if session.terminated {
            return Err(MarketplaceError::SessionTerminated);
        }
        if session.authenticated.is_none() {
            return Err(MarketplaceError::NotAuthenticated {
                consumer: "<anonymous>".to_string(),
            });
        }
        Ok(())
    }
}

fn matches_query(query: &OfferingQuery, offering: &SubscribableOfferingDescription) -> bool {
    if offering.information.category != query.information.category {
        return false;
    }
    if let Some(city) = &query.city {
        if offering.city.as_deref() != Some(city.as_str()) {
            return false;
        }
    }
    if let Some(model) = query.pricing_model {
        if offering.pricing_model != model {
            return false;
        }
    }
    if let Some(license) = query.license {
        if offering.license != license {
            return false;
        }
    }
    if let Some(max_price) = query.max_price {
        if offering.price.currency != max_price.currency || offering.price.amount > max_price.amount {
            return false;
        }
    }
    true
}

#[async_trait]
impl Marketplace for InMemoryMarketplace {
    async fn authenticate(&self, consumer: &ConsumerConfig, secret: &str) -> Result<()> {
        let accepted = self
            .inner
            .secrets
            .read()
            .get(&consumer.consumer_id)
            .map(|expected| expected == secret)
            .unwrap_or(false);

        if !accepted {
            warn!(consumer = %consumer.consumer_id, "Authentication rejected");
            return Err(MarketplaceError::AuthenticationFailed {
                consumer: consumer.consumer_id.clone(),
            });
        }

        let mut session = self.inner.session.write();
        session.authenticated = Some(consumer.consumer_id.clone());
        session.terminated = false;
        Ok(())
    }

    async fn discover(&self, query: &OfferingQuery) -> Result<Vec<SubscribableOfferingDescription>> {
        self.ensure_authenticated()?;
        query.validate()?;

        let mut found: Vec<SubscribableOfferingDescription> = self
            .inner
            .listings
            .read()
            .values()
            .filter(|l| matches_query(query, &l.description))
            .map(|l| l.description.clone())
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));

        debug!(query = %query.name, found = found.len(), "Discovery served");
        Ok(found)
    }

    async fn subscribe(&self, description: &SubscribableOfferingDescription) -> Result<Offering> {
        self.ensure_authenticated()?;

        let current = self
            .inner
            .listings
            .read()
            .get(&description.id)
            .map(|l| l.description.clone())
            .ok_or_else(|| MarketplaceError::UnknownOffering {
                offering: description.id.to_string(),
            })?;

        self.inner
            .session
            .write()
            .subscriptions
            .insert(current.id.clone());

        info!(offering = %current.id, "Subscription created");
        Ok(Offering::new(current, Arc::new(self.clone())))
    }

    async fn unsubscribe(&self, offering: &Offering) -> Result<()> {
        let removed = self.inner.session.write().subscriptions.remove(offering.id());
        if !removed {
            return Err(MarketplaceError::not_subscribed(offering.id().to_string()));
        }
        Ok(())
    }

    async fn terminate(&self) -> Result<()> {
        let mut session = self.inner.session.write();
        session.terminated = true;
        session.authenticated = None;
        session.subscriptions.clear();
        Ok(())
    }
}

#[async_trait]
impl OfferingAccess for InMemoryMarketplace {
    async fn access(&self, offering: &OfferingId, params: &AccessParameters) -> Result<AccessResponse> {
        {
            let session = self.inner.session.read();
            if session.terminated {
                return Err(MarketplaceError::SessionTerminated);
            }
            if !session.subscriptions.contains(offering) {
                return Err(MarketplaceError::not_subscribed(offering.to_string()));
            }
        }

        let responder = {
            let mut listings = self.inner.listings.write();
            let listing = listings
                .get_mut(offering)
                .ok_or_else(|| MarketplaceError::UnknownOffering {
                    offering: offering.to_string(),
                })?;
            if !listing.description.activated {
                return Err(MarketplaceError::not_activated(offering.to_string()));
            }
            listing.access_count += 1;
            Arc::clone(&listing.responder)
        };

        let body = (*responder)(params)?;
        Ok(AccessResponse::new(offering.clone(), body))
    }
}
