//! Data sources a feed can poll

use async_trait::async_trait;

use marketfeed_marketplace::{AccessParameters, AccessResponse, Offering};

/// Anything that answers a single access call
#[async_trait]
pub trait PollSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> String;

    /// Perform one access with the feed's parameters
    async fn poll(&self, params: &AccessParameters) -> marketfeed_marketplace::Result<AccessResponse>;
}

#[async_trait]
impl PollSource for Offering {
    fn name(&self) -> String {
        self.id().to_string()
    }

    async fn poll(&self, params: &AccessParameters) -> marketfeed_marketplace::Result<AccessResponse> {
        self.access_one_time(params).await
    }
}
