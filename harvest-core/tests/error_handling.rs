use harvest_core::{
    CollectionError, ConfigError, CoreError, ErrorClass, ErrorExt, RedditApiError, RetryError,
};

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::RequestTimeout);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let retry_error = CoreError::Retry(RetryError::NoData { attempts: 5 });
    assert_eq!(retry_error.error_code(), "RETRY");

    let collection_error = CoreError::Collection(CollectionError::NoDetails {
        subreddit: "rust".to_string(),
    });
    assert_eq!(collection_error.error_code(), "COLLECTION");

    let config_error = CoreError::Config(ConfigError::ValidationFailed {
        reason: "bad".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");
}

#[test]
fn test_rate_limit_classification() {
    let typed = CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert!(typed.is_rate_limited());
    assert_eq!(typed.error_class(), ErrorClass::RateLimited);

    let server = CoreError::RedditApi(RedditApiError::ServerError { status_code: 502 });
    assert!(!server.is_rate_limited());
    assert_eq!(server.error_class(), ErrorClass::Transient);

    let io = CoreError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "proxy returned 429",
    ));
    assert!(io.is_rate_limited());
}

#[test]
fn test_retry_error_attempts() {
    let exhausted = RetryError::RateLimitExhausted {
        attempts: 5,
        message: "Rate limit exceeded".to_string(),
    };
    assert_eq!(exhausted.attempts(), 5);

    let failed = RetryError::Failed {
        attempts: 3,
        source: Box::new(CoreError::Internal {
            message: "boom".to_string(),
        }),
    };
    assert_eq!(failed.attempts(), 3);
    assert!(failed.to_string().contains("boom"));
}

#[test]
fn test_user_friendly_messages() {
    let error = CoreError::Collection(CollectionError::NoListings {
        subreddit: "pauper".to_string(),
    });
    let message = error.user_friendly_message();
    assert!(message.contains("r/pauper"));

    let config_error = CoreError::Config(ConfigError::InvalidValue {
        field: "collection.batch_size".to_string(),
        value: "0".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("collection.batch_size"));
}
