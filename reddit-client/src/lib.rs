pub mod api;
pub mod retry;
pub mod source;

pub use api::RedditJsonClient;
pub use retry::{
    BackoffPolicy, Payload, RecordingSleeper, RetryExecutor, RetryState, Sleeper, TokioSleeper,
};
pub use source::RedditSource;
