use harvest_core::ListingItem;
use std::collections::HashSet;

/// Drops listing items whose identity key was already seen.
///
/// The seen set lives on the value, so one deduplicator spans every category
/// fetched in a run and a fresh one starts each run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep first occurrences, in input order.
    pub fn retain_unique(&mut self, items: Vec<ListingItem>) -> Vec<ListingItem> {
        items
            .into_iter()
            .filter(|item| self.seen.insert(item.identity_key().to_string()))
            .collect()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: Option<&str>, permalink: &str, title: &str) -> ListingItem {
        ListingItem {
            id: id.map(str::to_string),
            upvotes: 0,
            num_comments: 0,
            total_awards_received: 0,
            permalink: permalink.to_string(),
            created_utc: 0.0,
            title: title.to_string(),
        }
    }

    fn titles(items: &[ListingItem]) -> Vec<&str> {
        items.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn test_keeps_first_occurrence_in_order() {
        let mut dedupe = Deduplicator::new();
        let unique = dedupe.retain_unique(vec![
            item(Some("a"), "/a", "first a"),
            item(Some("b"), "/b", "b"),
            item(Some("a"), "/a-again", "second a"),
            item(Some("c"), "/c", "c"),
        ]);

        assert_eq!(titles(&unique), vec!["first a", "b", "c"]);
        assert_eq!(dedupe.seen_count(), 3);
    }

    #[test]
    fn test_seen_set_spans_calls() {
        let mut dedupe = Deduplicator::new();
        let hot = dedupe.retain_unique(vec![item(Some("a"), "/a", "hot a")]);
        let top = dedupe.retain_unique(vec![
            item(Some("a"), "/a", "top a"),
            item(Some("z"), "/z", "top z"),
        ]);

        assert_eq!(titles(&hot), vec!["hot a"]);
        assert_eq!(titles(&top), vec!["top z"]);
    }

    #[test]
    fn test_permalink_fallback_and_empty_key_collision() {
        let mut dedupe = Deduplicator::new();
        let unique = dedupe.retain_unique(vec![
            item(None, "/r/x/1", "by permalink"),
            item(Some(""), "/r/x/1", "same permalink"),
            item(None, "", "no key one"),
            item(None, "", "no key two"),
        ]);

        assert_eq!(titles(&unique), vec!["by permalink", "no key one"]);
    }

    #[test]
    fn test_output_has_unique_keys() {
        let items: Vec<ListingItem> = (0..50)
            .map(|i| {
                let id = format!("id{}", i % 17);
                item(Some(id.as_str()), "", &format!("t{}", i))
            })
            .collect();

        let unique = Deduplicator::new().retain_unique(items);
        let keys: HashSet<&str> = unique.iter().map(|i| i.identity_key()).collect();
        assert_eq!(keys.len(), unique.len());
        assert_eq!(unique.len(), 17);
        assert_eq!(unique[0].title, "t0");
        assert_eq!(unique[16].title, "t16");
    }
}
