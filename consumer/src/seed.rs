//! Demo marketplace populated with parking offerings

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use marketfeed_marketplace::{
    AccessParameters, AccessValue, InMemoryMarketplace, Information, LicenseType, OfferingId,
    Price, PricingModel, Responder, Result, SubscribableOfferingDescription,
};

use crate::config::ConsumerAppConfig;

/// Largest number of spaces reported by one access
const MAX_SPACES: i64 = 5;

/// Meters covered by each reported space
const METERS_PER_SPACE: i64 = 200;

/// Marketplace knowing the configured consumer and a handful of parking
/// offerings, only one of which the scenario's selection rules accept
pub fn demo_marketplace(config: &ConsumerAppConfig) -> InMemoryMarketplace {
    let marketplace = InMemoryMarketplace::new();
    marketplace.register_consumer(config.consumer.consumer_id.clone(), config.secret.clone());

    let category = config.query.category.as_str();
    let listings = [
        ("Barcelona-Parking-Local", "Barcelona", "localhost", 0.001, LicenseType::OpenDataLicense),
        ("Barcelona-Parking-Premium", "Barcelona", "localhost", 0.0018, LicenseType::OpenDataLicense),
        ("Barcelona-Parking-Remote", "Barcelona", "parking.bcn.example", 0.0005, LicenseType::OpenDataLicense),
        ("Berlin-Parking", "Berlin", "localhost", 0.001, LicenseType::CreativeCommons),
    ];

    let count = listings.len();
    for (id, city, host, price, license) in listings {
        let description = parking_offering(id, category, city, host, price, license);
        marketplace.register_offering(description, parking_responder());
    }

    info!(offerings = count, "Demo marketplace seeded");
    marketplace
}

fn parking_offering(
    id: &str,
    category: &str,
    city: &str,
    host: &str,
    price: f64,
    license: LicenseType,
) -> SubscribableOfferingDescription {
    SubscribableOfferingDescription {
        id: OfferingId::new(id),
        name: id.replace('-', " "),
        information: Information::new("Parking", category),
        city: Some(city.to_string()),
        price: Price::euros(price),
        pricing_model: PricingModel::PerAccess,
        license,
        endpoint_host: host.to_string(),
        activated: true,
    }
}

/// Answers with spaces spread over the requested area, alternating between
/// available and occupied
pub fn parking_responder() -> Responder {
    Arc::new(|params: &AccessParameters| -> Result<String> {
        let latitude = number(params, "areaSpecification.geoCoordinates.latitude").unwrap_or(0.0);
        let longitude = number(params, "areaSpecification.geoCoordinates.longitude").unwrap_or(0.0);
        let radius = number(params, "areaSpecification.radius").unwrap_or(METERS_PER_SPACE as f64);

        let spaces = ((radius as i64) / METERS_PER_SPACE).clamp(1, MAX_SPACES);
        let results: Vec<serde_json::Value> = (0..spaces)
            .map(|i| {
                let offset = (i + 1) as f64;
                json!({
                    "geoCoordinates": {
                        "latitude": latitude + offset * 0.001,
                        "longitude": longitude - offset * 0.001,
                    },
                    "distance": radius * offset / (spaces + 1) as f64,
                    "status": if i % 2 == 0 { "available" } else { "occupied" },
                })
            })
            .collect();

        Ok(serde_json::to_string(&results)?)
    })
}

fn number(params: &AccessParameters, path: &str) -> Option<f64> {
    match params.get_path(path)? {
        AccessValue::Number(value) => Some(*value),
        AccessValue::Integer(value) => Some(*value as f64),
        _ => None,
    }
}
