//! End-to-end collection run.
//!
//! listings per category -> dedupe -> rank -> paced detail fetches with
//! periodic checkpoints -> final output. Every external call is awaited in
//! turn; nothing runs concurrently.

use crate::dedupe::Deduplicator;
use crate::pacing::Pacer;
use crate::rank::ImportanceRanker;
use checkpoint_store::{write_output, CheckpointStore};
use harvest_core::{
    validate_subreddit, CollectedItem, CollectionError, CoreError, ErrorExt, HarvestConfig,
    ListingItem, ResumeMode,
};
use reddit_client::{RedditSource, RetryExecutor, Sleeper};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output_path: PathBuf,
    /// Items carried over from a checkpoint.
    pub resumed: usize,
    /// Items fetched during this run.
    pub collected: usize,
    /// Ranked posts whose detail could not be fetched.
    pub skipped: usize,
    pub items: Vec<CollectedItem>,
}

pub struct CollectionOrchestrator {
    source: Arc<dyn RedditSource>,
    retry: RetryExecutor,
    store: CheckpointStore,
    pacer: Pacer,
    config: HarvestConfig,
}

impl CollectionOrchestrator {
    pub fn new(
        source: Arc<dyn RedditSource>,
        config: HarvestConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            source,
            retry: RetryExecutor::from_settings(&config.retry, sleeper.clone()),
            store: CheckpointStore::new(config.output_dir.clone()),
            pacer: Pacer::new(config.pacing.clone(), sleeper),
            config,
        }
    }

    pub fn checkpoint_store(&self) -> &CheckpointStore {
        &self.store
    }

    pub async fn run(&self, subreddit: &str) -> Result<RunSummary, CoreError> {
        if let Err(e) = validate_subreddit(subreddit) {
            e.log_error();
            return Err(e);
        }

        let mut collected = self.store.load(subreddit).await;
        let resumed = collected.len();

        let ranked = if resumed > 0 && self.config.collection.resume == ResumeMode::Checkpoint {
            info!(
                "Resuming r/{} from checkpoint with {} posts; listings are not refetched",
                subreddit, resumed
            );
            Vec::new()
        } else {
            match self.prioritize(subreddit).await {
                Ok(ranked) => ranked,
                Err(CoreError::Collection(CollectionError::NoListings { .. })) if resumed > 0 => {
                    warn!(
                        "No listings fetched for r/{}; finishing from the {} checkpointed posts",
                        subreddit, resumed
                    );
                    Vec::new()
                }
                Err(e) => {
                    e.log_error();
                    return Err(e);
                }
            }
        };

        let skipped = self
            .collect_details(subreddit, &ranked, &mut collected)
            .await;

        if collected.is_empty() {
            let err = CoreError::from(CollectionError::NoDetails {
                subreddit: subreddit.to_string(),
            });
            err.log_error();
            return Err(err);
        }

        let output_path = self.config.output_path(subreddit);
        write_output(&output_path, &collected).await?;
        if let Err(e) = self.store.clear(subreddit).await {
            warn!("Output written but checkpoint could not be removed: {}", e);
        }

        info!(
            "Scraping complete! {} posts ({} resumed, {} new, {} skipped)",
            collected.len(),
            resumed,
            collected.len() - resumed,
            skipped
        );

        Ok(RunSummary {
            output_path,
            resumed,
            collected: collected.len() - resumed,
            skipped,
            items: collected,
        })
    }

    /// Fetch every category, dedupe, and keep the most important posts.
    async fn prioritize(&self, subreddit: &str) -> Result<Vec<ListingItem>, CoreError> {
        let listing = &self.config.listing;
        let per_category = listing.per_category_limit();
        let mut dedupe = Deduplicator::new();
        let mut unique_posts = Vec::new();
        let mut fetched_any = false;

        info!("Fetching posts from r/{}...", subreddit);
        for (index, category) in listing.categories.iter().enumerate() {
            if index > 0 {
                self.pacer.between_categories().await;
            }

            info!("Fetching {} posts...", category);
            let operation_name = format!("listing r/{}/{}", subreddit, category);
            match self
                .retry
                .execute(&operation_name, || {
                    self.source
                        .fetch_listing(subreddit, per_category, category)
                })
                .await
            {
                Ok(posts) => {
                    info!("Fetched {} {} posts", posts.len(), category);
                    fetched_any = true;
                    unique_posts.extend(dedupe.retain_unique(posts));
                }
                Err(e) => {
                    warn!("Skipping {} posts for r/{}: {}", category, subreddit, e);
                }
            }
        }

        if !fetched_any {
            return Err(CollectionError::NoListings {
                subreddit: subreddit.to_string(),
            }
            .into());
        }

        info!("Found {} unique posts", unique_posts.len());
        let prioritized =
            ImportanceRanker::new(self.config.collection.target_posts).rank(unique_posts);
        info!(
            "Selected top {} posts for detailed scraping",
            prioritized.len()
        );
        Ok(prioritized)
    }

    /// Fetch details batch by batch, appending to `collected`. Returns the
    /// number of posts given up on.
    async fn collect_details(
        &self,
        subreddit: &str,
        ranked: &[ListingItem],
        collected: &mut Vec<CollectedItem>,
    ) -> usize {
        let batch_size = self.config.collection.batch_size.max(1);
        let checkpoint_interval = self.config.collection.checkpoint_interval.max(1);
        let total = ranked.len();
        let batch_count = (total + batch_size - 1) / batch_size;

        let mut known: HashSet<String> = collected
            .iter()
            .flat_map(|item| [item.identity_key().to_string(), item.permalink.clone()])
            .filter(|key| !key.is_empty())
            .collect();
        let mut newly_added = 0usize;
        let mut skipped = 0usize;

        for (batch_index, batch) in ranked.chunks(batch_size).enumerate() {
            info!("Processing batch {}/{}", batch_index + 1, batch_count);

            for (offset, post) in batch.iter().enumerate() {
                let position = batch_index * batch_size + offset + 1;
                if known.contains(post.identity_key()) || known.contains(&post.permalink) {
                    debug!("Post {} already collected, skipping", post.identity_key());
                    continue;
                }

                let short_title: String = post.title.chars().take(50).collect();
                info!("Scraping post {}/{}: {}...", position, total, short_title);

                let operation_name = format!("detail {}", post.permalink);
                match self
                    .retry
                    .execute(&operation_name, || self.source.fetch_detail(&post.permalink))
                    .await
                {
                    Ok(detail) => {
                        let item = CollectedItem::merge(post, detail);
                        known.insert(item.identity_key().to_string());
                        known.insert(item.permalink.clone());
                        collected.push(item);
                        newly_added += 1;

                        if newly_added % checkpoint_interval == 0 {
                            if let Err(e) = self.store.save(subreddit, collected).await {
                                e.log_warn();
                            }
                        }
                    }
                    Err(e) => {
                        skipped += 1;
                        warn!("Skipping post {}: {}", post.permalink, e);
                    }
                }

                self.pacer.between_items().await;
            }

            if batch_index + 1 < batch_count {
                self.pacer.between_batches().await;
            }
        }

        if skipped > 0 {
            warn!(
                "{} of {} posts for r/{} could not be scraped",
                skipped, total, subreddit
            );
        }
        skipped
    }
}
