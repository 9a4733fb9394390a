pub mod dedupe;
pub mod orchestrator;
pub mod pacing;
pub mod rank;

pub use dedupe::Deduplicator;
pub use orchestrator::{CollectionOrchestrator, RunSummary};
pub use pacing::Pacer;
pub use rank::ImportanceRanker;
