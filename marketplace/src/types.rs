//! Core data types for offering discovery and access

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{MarketplaceError, Result};
use crate::{LicenseType, PricingModel};

/// Marker the marketplace embeds in bodies of failed access calls
pub const ERROR_MARKER: &str = "error";

/// Semantic description of an offering or a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Information {
    pub name: String,
    pub category: String, // e.g. "bigiot:Parking"
}

impl Information {
    pub fn new<N: Into<String>, C: Into<String>>(name: N, category: C) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }
}

/// Currencies accepted on the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
}

/// Price of a single charging unit of an offering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    pub currency: Currency,
}

impl Price {
    /// Price expressed in euros
    pub fn euros(amount: f64) -> Self {
        Self {
            amount,
            currency: Currency::Eur,
        }
    }
}

/// Identifier of an offering on the marketplace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferingId(String);

impl OfferingId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OfferingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Search query for offerings. Built once with [`OfferingQuery::new`] and the
/// consuming `with_*` setters, then handed to discovery unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferingQuery {
    pub name: String,
    pub information: Information,
    pub city: Option<String>,
    pub pricing_model: Option<PricingModel>,
    pub max_price: Option<Price>,
    pub license: Option<LicenseType>,
}

impl OfferingQuery {
    pub fn new<S: Into<String>>(name: S, information: Information) -> Self {
        Self {
            name: name.into(),
            information,
            city: None,
            pricing_model: None,
            max_price: None,
            license: None,
        }
    }

    pub fn in_city<S: Into<String>>(mut self, city: S) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_pricing_model(mut self, pricing_model: PricingModel) -> Self {
        self.pricing_model = Some(pricing_model);
        self
    }

    pub fn with_max_price(mut self, price: Price) -> Self {
        self.max_price = Some(price);
        self
    }

    pub fn with_license(mut self, license: LicenseType) -> Self {
        self.license = Some(license);
        self
    }

    /// A query must at least name the category it is looking for
    pub fn validate(&self) -> Result<()> {
        if self.information.category.trim().is_empty() {
            return Err(MarketplaceError::incomplete_query(format!(
                "query '{}' has no category",
                self.name
            )));
        }
        if let Some(price) = self.max_price {
            if price.amount < 0.0 {
                return Err(MarketplaceError::incomplete_query(format!(
                    "query '{}' has a negative max price",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Offering as returned by discovery, before subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribableOfferingDescription {
    pub id: OfferingId,
    pub name: String,
    pub information: Information,
    pub city: Option<String>,
    pub price: Price,
    pub pricing_model: PricingModel,
    pub license: LicenseType,
    /// Host serving the offering's access endpoint
    pub endpoint_host: String,
    pub activated: bool,
}

impl SubscribableOfferingDescription {
    /// One-line summary used when listing discovery results
    pub fn summary(&self) -> String {
        format!(
            "{} [{}] {} EUR {} ({}, {})",
            self.name,
            self.id,
            self.price.amount,
            self.pricing_model,
            self.license,
            self.endpoint_host
        )
    }

    pub fn is_localhost(&self) -> bool {
        matches!(self.endpoint_host.as_str(), "localhost" | "127.0.0.1" | "::1")
    }
}

/// Single value inside an [`AccessParameters`] tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccessValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Nested(AccessParameters),
}

impl From<bool> for AccessValue {
    fn from(value: bool) -> Self {
        AccessValue::Bool(value)
    }
}

impl From<i64> for AccessValue {
    fn from(value: i64) -> Self {
        AccessValue::Integer(value)
    }
}

impl From<i32> for AccessValue {
    fn from(value: i32) -> Self {
        AccessValue::Integer(value.into())
    }
}

impl From<f64> for AccessValue {
    fn from(value: f64) -> Self {
        AccessValue::Number(value)
    }
}

impl From<&str> for AccessValue {
    fn from(value: &str) -> Self {
        AccessValue::Text(value.to_string())
    }
}

impl From<String> for AccessValue {
    fn from(value: String) -> Self {
        AccessValue::Text(value)
    }
}

impl From<AccessParameters> for AccessValue {
    fn from(value: AccessParameters) -> Self {
        AccessValue::Nested(value)
    }
}

/// Immutable key-value tree passed to an offering on every access
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessParameters(BTreeMap<String, AccessValue>);

impl AccessParameters {
    /// Build a parameter tree from its entries
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AccessValue>,
    {
        Self(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&AccessValue> {
        self.0.get(key)
    }

    /// Look up a value by dotted path, e.g. `areaSpecification.radius`
    pub fn get_path(&self, path: &str) -> Option<&AccessValue> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            match current {
                AccessValue::Nested(inner) => current = inner.0.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object form sent to the offering endpoint
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Body returned by one access call to an offering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessResponse {
    pub offering: OfferingId,
    pub body: String,
}

impl AccessResponse {
    pub fn new<S: Into<String>>(offering: OfferingId, body: S) -> Self {
        Self {
            offering,
            body: body.into(),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the body carries the marketplace's error marker
    pub fn contains_error_marker(&self) -> bool {
        self.body.contains(ERROR_MARKER)
    }

    pub fn as_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Number of top-level elements in the JSON body
    pub fn element_count(&self) -> Result<usize> {
        Ok(match self.as_json()? {
            serde_json::Value::Array(items) => items.len(),
            serde_json::Value::Object(fields) => fields.len(),
            _ => 0,
        })
    }

    /// Deserialize the body into typed results. A JSON array maps element by
    /// element; a single object maps to a one-element vector.
    pub fn map<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let json = self.as_json()?;
        let items = match json {
            serde_json::Value::Array(items) => items,
            object @ serde_json::Value::Object(_) => vec![object],
            other => {
                return Err(MarketplaceError::mapping(format!(
                    "expected array or object, got {}",
                    other
                )))
            }
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item).map_err(|e| {
                    MarketplaceError::mapping(format!("element {}: {}", index, e))
                })
            })
            .collect()
    }
}
