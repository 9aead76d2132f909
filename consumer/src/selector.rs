//! Choice of one offering among discovery results

use std::cmp::Ordering;
use tracing::debug;

use marketfeed_marketplace::SubscribableOfferingDescription;

/// Selection rules applied to discovered offerings. Price is compared
/// before license when both rules are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OfferingSelector {
    /// Keep only offerings served from the local host
    pub only_localhost: bool,

    /// Prefer the lowest price
    pub cheapest: bool,

    /// Prefer the most permissive license
    pub most_permissive: bool,
}

impl OfferingSelector {
    pub fn new(only_localhost: bool, cheapest: bool, most_permissive: bool) -> Self {
        Self {
            only_localhost,
            cheapest,
            most_permissive,
        }
    }

    /// Pick an offering, or `None` when no candidate passes the filters.
    /// Ties keep discovery order.
    pub fn select<'a>(
        &self,
        candidates: &'a [SubscribableOfferingDescription],
    ) -> Option<&'a SubscribableOfferingDescription> {
        let selected = candidates
            .iter()
            .filter(|c| !self.only_localhost || c.is_localhost())
            .reduce(|best, candidate| {
                if self.compare(candidate, best) == Ordering::Less {
                    candidate
                } else {
                    best
                }
            });

        debug!(
            candidates = candidates.len(),
            selected = ?selected.map(|s| s.id.as_str()),
            "Offering selection finished"
        );
        selected
    }

    fn compare(
        &self,
        a: &SubscribableOfferingDescription,
        b: &SubscribableOfferingDescription,
    ) -> Ordering {
        let by_price = if self.cheapest {
            a.price
                .amount
                .partial_cmp(&b.price.amount)
                .unwrap_or(Ordering::Equal)
        } else {
            Ordering::Equal
        };

        by_price.then_with(|| {
            if self.most_permissive {
                a.license
                    .permissiveness_rank()
                    .cmp(&b.license.permissiveness_rank())
            } else {
                Ordering::Equal
            }
        })
    }
}
