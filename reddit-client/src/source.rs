use async_trait::async_trait;
use harvest_core::{CoreError, DetailRecord, ListingItem};

/// The paginated, rate-limited data source a harvest reads from.
///
/// Either call may fail with a transport or throttling error, or succeed
/// with nothing (an empty listing, a `None` detail).
#[async_trait]
pub trait RedditSource: Send + Sync {
    async fn fetch_listing(
        &self,
        subreddit: &str,
        limit: usize,
        category: &str,
    ) -> Result<Vec<ListingItem>, CoreError>;

    async fn fetch_detail(&self, permalink: &str) -> Result<Option<DetailRecord>, CoreError>;
}
