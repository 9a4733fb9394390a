use harvest_core::ListingItem;
use std::cmp::Reverse;

/// Orders posts by engagement and keeps the top `target_count`.
#[derive(Debug, Clone, Copy)]
pub struct ImportanceRanker {
    target_count: usize,
}

impl ImportanceRanker {
    pub fn new(target_count: usize) -> Self {
        Self { target_count }
    }

    /// Stable descending sort on `ListingItem::importance_score`, then truncate.
    pub fn rank(&self, mut items: Vec<ListingItem>) -> Vec<ListingItem> {
        items.sort_by_key(|item| Reverse(item.importance_score()));
        items.truncate(self.target_count);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, upvotes: u64, num_comments: u64, awards: u64) -> ListingItem {
        ListingItem {
            id: Some(id.to_string()),
            upvotes,
            num_comments,
            total_awards_received: awards,
            permalink: format!("/r/test/comments/{}/", id),
            created_utc: 0.0,
            title: id.to_string(),
        }
    }

    fn ids(items: &[ListingItem]) -> Vec<&str> {
        items.iter().map(|i| i.identity_key()).collect()
    }

    #[test]
    fn test_comments_and_awards_outweigh_upvotes() {
        let ranked = ImportanceRanker::new(2).rank(vec![item("a", 10, 2, 0), item("b", 1, 5, 1)]);

        assert_eq!(ids(&ranked), vec!["b", "a"]);
        assert_eq!(ranked[0].importance_score(), 26);
        assert_eq!(ranked[1].importance_score(), 16);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranked = ImportanceRanker::new(10).rank(vec![
            item("x", 3, 0, 0),
            item("y", 0, 1, 0),
            item("top", 100, 0, 0),
            item("z", 3, 0, 0),
        ]);

        assert_eq!(ids(&ranked), vec!["top", "x", "y", "z"]);
    }

    #[test]
    fn test_truncates_to_target() {
        let items: Vec<ListingItem> = (0..20).map(|i| item(&format!("p{}", i), i, 0, 0)).collect();
        let ranked = ImportanceRanker::new(5).rank(items);

        assert_eq!(ids(&ranked), vec!["p19", "p18", "p17", "p16", "p15"]);
    }

    #[test]
    fn test_under_supply_returns_everything() {
        let ranked = ImportanceRanker::new(500).rank(vec![item("a", 1, 0, 0), item("b", 2, 0, 0)]);
        assert_eq!(ids(&ranked), vec!["b", "a"]);

        assert!(ImportanceRanker::new(3).rank(Vec::new()).is_empty());
    }

    #[test]
    fn test_output_sorted_descending() {
        let items: Vec<ListingItem> = (0..40u64)
            .map(|i| item(&format!("p{}", i), (i * 7919) % 53, i % 5, i % 3))
            .collect();
        let ranked = ImportanceRanker::new(40).rank(items);

        for pair in ranked.windows(2) {
            assert!(pair[0].importance_score() >= pair[1].importance_score());
        }
    }
}
