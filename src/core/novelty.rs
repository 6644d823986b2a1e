use crate::domain::model::{Ledger, Listing};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Partition {
    /// Listings not in the ledger, in fetch order.
    pub new: Vec<Listing>,
    /// `ledger ∪ ids(new)`. Only persisted once delivery succeeded.
    pub updated_ledger: Ledger,
    pub seen: usize,
    pub invalid: usize,
}

/// Splits `fetched` into listings that were never delivered and those that were.
pub fn partition(fetched: Vec<Listing>, ledger: &Ledger) -> Partition {
    let mut result = Partition {
        updated_ledger: ledger.clone(),
        ..Partition::default()
    };

    for listing in fetched {
        let id = listing.id.trim();
        if id.is_empty() {
            tracing::warn!("Listing '{}' has no id, skipping", listing.title);
            result.invalid += 1;
            continue;
        }

        if ledger.contains(id) {
            result.seen += 1;
            continue;
        }

        // Same posting returned twice in one fetch: first occurrence wins.
        if !result.updated_ledger.insert(id.to_string()) {
            tracing::debug!("Duplicate listing {} in this fetch", id);
            result.seen += 1;
            continue;
        }

        tracing::debug!("Found new listing: {}", id);
        result.new.push(listing);
    }

    tracing::info!(
        "Found {} new listings ({} already sent, {} invalid)",
        result.new.len(),
        result.seen,
        result.invalid
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_of(ids: &[&str]) -> Ledger {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn listings(ids: &[&str]) -> Vec<Listing> {
        ids.iter()
            .map(|id| Listing::new(*id, format!("Tester {}", id)))
            .collect()
    }

    fn ids(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_known_listing_is_filtered() {
        let mut fetched = listings(&["job1", "job2"]);
        fetched[0].location = Some("Warsaw, PL".to_string());

        let result = partition(fetched, &ledger_of(&["job2"]));

        assert_eq!(ids(&result.new), vec!["job1"]);
        assert_eq!(result.updated_ledger, ledger_of(&["job1", "job2"]));
        assert_eq!(result.seen, 1);
        assert_eq!(result.invalid, 0);
    }

    #[test]
    fn test_new_keeps_arrival_order() {
        let result = partition(listings(&["z", "b", "y", "a"]), &ledger_of(&["b"]));
        assert_eq!(ids(&result.new), vec!["z", "y", "a"]);
    }

    #[test]
    fn test_partition_is_idempotent() {
        let fetched = listings(&["job1", "job2", "job3"]);
        let ledger = ledger_of(&["job3"]);

        let first = partition(fetched.clone(), &ledger);
        let second = partition(fetched, &ledger);
        assert_eq!(first, second);
    }

    #[test]
    fn test_updated_ledger_is_a_superset() {
        let ledger = ledger_of(&["old1", "old2"]);
        let result = partition(listings(&["new1", "old1"]), &ledger);

        assert!(result.updated_ledger.is_superset(&ledger));
        assert_eq!(result.updated_ledger.len(), 3);
    }

    #[test]
    fn test_empty_id_is_dropped() {
        let result = partition(listings(&["", "  ", "job1"]), &Ledger::new());

        assert_eq!(ids(&result.new), vec!["job1"]);
        assert_eq!(result.invalid, 2);
        assert_eq!(result.updated_ledger, ledger_of(&["job1"]));
    }

    #[test]
    fn test_duplicate_in_one_fetch_reported_once() {
        let mut fetched = listings(&["job1", "job2", "job1"]);
        fetched[2].title = "Tester job1 (page 2)".to_string();

        let result = partition(fetched, &Ledger::new());

        assert_eq!(ids(&result.new), vec!["job1", "job2"]);
        assert_eq!(result.new[0].title, "Tester job1");
    }

    #[test]
    fn test_all_seen_yields_empty_new_set() {
        let ledger = ledger_of(&["job1", "job2"]);
        let result = partition(listings(&["job1", "job2"]), &ledger);

        assert!(result.new.is_empty());
        assert_eq!(result.updated_ledger, ledger);
    }
}
