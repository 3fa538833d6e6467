use std::collections::HashSet;

/// Titles and links already accepted during one crawl session.
///
/// Matching is exact and case-sensitive. The ledger only grows; it is owned
/// by the listing walker and dropped with it.
#[derive(Debug, Default)]
pub struct DedupLedger {
    titles: HashSet<String>,
    links: HashSet<String>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a card unless its title or its link was seen before. On
    /// acceptance both keys are recorded.
    pub fn should_accept(&mut self, title: &str, link: &str) -> bool {
        if self.titles.contains(title) || self.links.contains(link) {
            return false;
        }
        self.titles.insert(title.to_string());
        self.links.insert(link.to_string());
        true
    }

    pub fn accepted(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_repeated_link_with_new_title() {
        let mut ledger = DedupLedger::new();
        assert!(ledger.should_accept("Acme ships widgets", "https://x.test/a"));
        assert!(!ledger.should_accept("Acme ships more widgets", "https://x.test/a"));
        assert_eq!(ledger.accepted(), 1);
    }

    #[test]
    fn test_rejects_repeated_title_with_new_link() {
        let mut ledger = DedupLedger::new();
        assert!(ledger.should_accept("Acme ships widgets", "https://x.test/a"));
        assert!(!ledger.should_accept("Acme ships widgets", "https://x.test/b"));
        // The rejected link was not recorded.
        assert!(ledger.should_accept("Other", "https://x.test/b"));
    }

    #[test]
    fn test_matching_is_exact() {
        let mut ledger = DedupLedger::new();
        assert!(ledger.should_accept("Acme", "https://x.test/a"));
        assert!(ledger.should_accept("acme", "https://x.test/A"));
        assert!(ledger.should_accept("Acme ", "https://x.test/a/"));
        assert_eq!(ledger.accepted(), 3);
    }
}
