use crate::source::RedditSource;
use async_trait::async_trait;
use harvest_core::{Comment, CoreError, DetailRecord, ListingItem, RedditApiError, SourceConfig};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Reddit caps listing pages at 100 children.
const MAX_PAGE_SIZE: usize = 100;

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Replies nested deeper than this are dropped while building the tree.
const MAX_COMMENT_DEPTH: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub ups: i64,
    #[serde(default)]
    pub num_comments: Option<u64>,
    #[serde(default)]
    pub total_awards_received: Option<u64>,
}

impl From<RedditPostData> for ListingItem {
    fn from(post_data: RedditPostData) -> Self {
        Self {
            id: Some(post_data.id).filter(|id| !id.is_empty()),
            upvotes: post_data.ups.max(0) as u64,
            num_comments: post_data.num_comments.unwrap_or(0),
            total_awards_received: post_data.total_awards_received.unwrap_or(0),
            permalink: post_data.permalink,
            created_utc: post_data.created_utc,
            title: post_data.title,
        }
    }
}

/// Reads the public `.json` endpoints; no OAuth.
#[derive(Debug, Clone)]
pub struct RedditJsonClient {
    http_client: Client,
    base_url: String,
    time_filter: String,
}

impl RedditJsonClient {
    pub fn new(config: &SourceConfig, time_filter: impl Into<String>) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            time_filter: time_filter.into(),
        })
    }

    async fn get_json(
        &self,
        path: &str,
        query_params: &[(&str, String)],
        not_found: impl FnOnce() -> RedditApiError,
    ) -> Result<Value, CoreError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query_params);

        let response = match self.http_client.get(&url).query(query_params).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Request to {} timed out", path);
                return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
            }
            Err(e) => {
                error!("Network error for {}: {}", path, e);
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!("Request failed with status: {} for {}", status, path);
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    CoreError::RedditApi(RedditApiError::RateLimitExceeded {
                        retry_after: retry_after_secs(response.headers()),
                    })
                }
                StatusCode::FORBIDDEN => CoreError::RedditApi(RedditApiError::Forbidden {
                    resource: path.to_string(),
                }),
                StatusCode::NOT_FOUND => CoreError::RedditApi(not_found()),
                s if s.is_server_error() => CoreError::RedditApi(RedditApiError::ServerError {
                    status_code: s.as_u16(),
                }),
                s => CoreError::RequestFailed {
                    message: format!("unexpected status for {}", path),
                    status_code: Some(s.as_u16()),
                },
            });
        }

        response.json::<Value>().await.map_err(|e| {
            error!("Failed to parse response for {}: {}", path, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse JSON from {}", path),
            })
        })
    }

    fn listing_params(&self, category: &str, page_size: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", page_size.to_string()),
            ("raw_json", "1".to_string()),
        ];
        if matches!(category, "top" | "controversial") {
            params.push(("t", self.time_filter.clone()));
        }
        params
    }
}

#[async_trait]
impl RedditSource for RedditJsonClient {
    async fn fetch_listing(
        &self,
        subreddit: &str,
        limit: usize,
        category: &str,
    ) -> Result<Vec<ListingItem>, CoreError> {
        let path = format!("/r/{}/{}.json", subreddit, category);
        let mut items: Vec<ListingItem> = Vec::with_capacity(limit);
        let mut after: Option<String> = None;

        while items.len() < limit {
            let page_size = (limit - items.len()).min(MAX_PAGE_SIZE);
            let mut params = self.listing_params(category, page_size);
            if let Some(cursor) = &after {
                params.push(("after", cursor.clone()));
            }

            let value = self
                .get_json(&path, &params, || RedditApiError::SubredditNotFound {
                    subreddit: subreddit.to_string(),
                })
                .await?;
            let listing: RedditListing<RedditPostData> =
                serde_json::from_value(value).map_err(|e| {
                    error!("Failed to parse subreddit posts: {}", e);
                    CoreError::RedditApi(RedditApiError::InvalidResponse {
                        details: format!("Failed to parse posts for r/{}", subreddit),
                    })
                })?;

            let fetched = listing.data.children.len();
            items.extend(listing.data.children.into_iter().map(|c| c.data.into()));
            after = listing.data.after;

            debug!(
                "Fetched page of {} {} posts from r/{} ({} total)",
                fetched,
                category,
                subreddit,
                items.len()
            );
            if fetched == 0 || after.is_none() {
                break;
            }
        }

        items.truncate(limit);
        info!("Retrieved {} {} posts from r/{}", items.len(), category, subreddit);
        Ok(items)
    }

    async fn fetch_detail(&self, permalink: &str) -> Result<Option<DetailRecord>, CoreError> {
        let path = format!("{}.json", permalink.trim_end_matches('/'));
        let params = [("raw_json", "1".to_string())];

        let value = self
            .get_json(&path, &params, || RedditApiError::PostNotFound {
                permalink: permalink.to_string(),
            })
            .await?;

        Ok(parse_detail(&value))
    }
}

/// Seconds from a numeric `Retry-After` header, else 60. HTTP-date values
/// are not parsed.
fn retry_after_secs(headers: &HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Extract title, selftext and the comment tree from a post's JSON.
///
/// Returns `None` when the payload does not look like a post page.
pub fn parse_detail(value: &Value) -> Option<DetailRecord> {
    let post = value.get(0)?.pointer("/data/children/0/data")?;
    let title = post.get("title")?.as_str()?.to_string();
    let body = post
        .get("selftext")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let comments = value
        .get(1)
        .and_then(|listing| listing.pointer("/data/children"))
        .map(|children| comment_tree(children, 0))
        .unwrap_or_default();

    Some(DetailRecord {
        title,
        body,
        comments,
    })
}

fn comment_tree(children: &Value, depth: usize) -> Vec<Comment> {
    let Some(children) = children.as_array() else {
        return Vec::new();
    };
    if depth >= MAX_COMMENT_DEPTH {
        warn!("Dropping comments nested deeper than {}", MAX_COMMENT_DEPTH);
        return Vec::new();
    }

    children
        .iter()
        .filter(|child| child.get("kind").and_then(Value::as_str) == Some("t1"))
        .filter_map(|child| child.get("data"))
        .map(|data| {
            let body = data
                .get("body")
                .and_then(Value::as_str)
                .unwrap_or_default();
            // `replies` is an empty string when there are none
            let replies = data
                .pointer("/replies/data/children")
                .map(|nested| comment_tree(nested, depth + 1))
                .unwrap_or_default();
            Comment::new(body).with_replies(replies)
        })
        .collect()
}
