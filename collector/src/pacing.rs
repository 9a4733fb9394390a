use harvest_core::{DelayRange, PacingConfig};
use reddit_client::Sleeper;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Randomized waits between calls to the source.
pub struct Pacer {
    config: PacingConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl Pacer {
    pub fn new(config: PacingConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { config, sleeper }
    }

    pub async fn between_categories(&self) {
        let delay = draw(self.config.category_delay_secs);
        debug!("Waiting {:.1}s before next category", delay.as_secs_f64());
        self.sleeper.sleep(delay).await;
    }

    pub async fn between_items(&self) {
        let delay = draw(self.config.item_delay_secs);
        debug!("Waiting {:.1}s before next post", delay.as_secs_f64());
        self.sleeper.sleep(delay).await;
    }

    pub async fn between_batches(&self) {
        let delay = draw(self.config.batch_delay_secs);
        info!(
            "Batch complete. Waiting {:.1}s before next batch...",
            delay.as_secs_f64()
        );
        self.sleeper.sleep(delay).await;
    }
}

/// Uniform draw from `[min, max]`.
pub fn draw(range: DelayRange) -> Duration {
    let (min, max) = (range.min(), range.max());
    if max <= min {
        return min;
    }
    min + (max - min).mul_f64(fastrand::f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reddit_client::RecordingSleeper;

    #[test]
    fn test_draw_stays_in_range() {
        let range = DelayRange(1.0, 3.0);
        for _ in 0..200 {
            let delay = draw(range);
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_secs(3));
        }
        assert_eq!(draw(DelayRange(2.0, 2.0)), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_pacer_uses_configured_ranges() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let pacer = Pacer::new(PacingConfig::default(), sleeper.clone());

        pacer.between_categories().await;
        pacer.between_items().await;
        pacer.between_batches().await;

        let slept = sleeper.recorded();
        assert_eq!(slept.len(), 3);
        assert!(slept[0] >= Duration::from_secs(2) && slept[0] <= Duration::from_secs(5));
        assert!(slept[1] >= Duration::from_secs(1) && slept[1] <= Duration::from_secs(3));
        assert!(slept[2] >= Duration::from_secs(10) && slept[2] <= Duration::from_secs(20));
    }
}
