use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Retry error: {0}")]
    Retry(#[from] RetryError),

    #[error("Collection failed: {0}")]
    Collection(#[from] CollectionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<std::time::Duration>,
    },

    #[error("Request failed: {message}")]
    RequestFailed {
        message: String,
        status_code: Option<u16>,
    },
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Subreddit not found: {subreddit}")]
    SubredditNotFound { subreddit: String },

    #[error("Post not found: {permalink}")]
    PostNotFound { permalink: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

/// Terminal outcome of a retried call that never produced data.
#[derive(Error, Debug)]
pub enum RetryError {
    #[error("exhausted, no data after {attempts} attempts")]
    NoData { attempts: u32 },

    #[error("rate limit exhausted after {attempts} attempts: {message}")]
    RateLimitExhausted { attempts: u32, message: String },

    #[error("failed after {attempts} attempts: {source}")]
    Failed {
        attempts: u32,
        #[source]
        source: Box<CoreError>,
    },
}

impl RetryError {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::NoData { attempts }
            | RetryError::RateLimitExhausted { attempts, .. }
            | RetryError::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Run-level failures that end a collection with a non-zero exit.
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("no listings fetched for r/{subreddit}")]
    NoListings { subreddit: String },

    #[error("no details collected for r/{subreddit}")]
    NoDetails { subreddit: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
