use serde::{Deserialize, Deserializer, Serialize};

fn zero_if_null<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// A post as it appears in a subreddit listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub upvotes: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub num_comments: u64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_awards_received: u64,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub title: String,
}

impl ListingItem {
    /// Identity used for deduplication: the id when present and non-empty,
    /// otherwise the permalink (which may itself be empty).
    pub fn identity_key(&self) -> &str {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => &self.permalink,
        }
    }

    /// Weighted engagement: comments count triple, awards tenfold.
    pub fn importance_score(&self) -> u64 {
        self.upvotes
            .saturating_add(self.num_comments.saturating_mul(3))
            .saturating_add(self.total_awards_received.saturating_mul(10))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            replies: Vec::new(),
        }
    }

    pub fn with_replies(mut self, replies: Vec<Comment>) -> Self {
        self.replies = replies;
        self
    }
}

/// Full content of a single post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Listing metadata merged with the post's detail; the unit written to
/// checkpoints and to the final output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedItem {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub upvotes: u64,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub permalink: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl CollectedItem {
    pub fn merge(listing: &ListingItem, detail: DetailRecord) -> Self {
        Self {
            title: detail.title,
            body: detail.body,
            comments: detail.comments,
            upvotes: listing.upvotes,
            num_comments: listing.num_comments,
            created_utc: listing.created_utc,
            permalink: listing.permalink.clone(),
            id: listing.id.clone().filter(|id| !id.is_empty()),
        }
    }

    pub fn identity_key(&self) -> &str {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => &self.permalink,
        }
    }
}
