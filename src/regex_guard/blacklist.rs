use std::collections::{BTreeSet, VecDeque};

/// A (patterns, input) combination that once ran out of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct BlacklistEntry {
    patterns: BTreeSet<String>,
    fragment: String,
}

impl BlacklistEntry {
    /// Applies when the pattern sets overlap and either string contains the other.
    fn covers(&self, patterns: &[String], input: &str) -> bool {
        patterns.iter().any(|p| self.patterns.contains(p)) && (self.fragment.contains(input) || input.contains(self.fragment.as_str()))
    }
}

/// FIFO set of blacklisted matches, bounded by `capacity`.
#[derive(Debug)]
pub(super) struct Blacklist {
    entries: VecDeque<BlacklistEntry>,
    capacity: usize,
}

impl Blacklist {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(super) fn covers(&self, patterns: &[String], input: &str) -> bool {
        self.entries.iter().any(|entry| entry.covers(patterns, input))
    }

    pub(super) fn insert(&mut self, patterns: &[String], input: &str) {
        if self.capacity == 0 {
            return;
        }

        while self.entries.len() >= self.capacity {
            let _ = self.entries.pop_front();
        }

        self.entries.push_back(BlacklistEntry {
            patterns: patterns.iter().cloned().collect(),
            fragment: input.to_string(),
        });
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn overlap_is_order_independent() {
        let mut list = Blacklist::new(4);
        list.insert(&patterns(&["a+", "b+"]), "aaaa");

        assert!(list.covers(&patterns(&["b+", "a+"]), "aaaa"));
        assert!(list.covers(&patterns(&["c+", "b+"]), "aaaa"));
        assert!(!list.covers(&patterns(&["c+"]), "aaaa"));
    }

    #[test]
    fn fragment_containment_works_both_ways() {
        let mut list = Blacklist::new(4);
        list.insert(&patterns(&["a+"]), "xaaay");

        assert!(list.covers(&patterns(&["a+"]), "xaaay"));
        assert!(list.covers(&patterns(&["a+"]), "aaa"));
        assert!(list.covers(&patterns(&["a+"]), "__xaaay__"));
        assert!(!list.covers(&patterns(&["a+"]), "zzz"));
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut list = Blacklist::new(2);
        list.insert(&patterns(&["1"]), "one");
        list.insert(&patterns(&["2"]), "two");
        list.insert(&patterns(&["3"]), "three");

        assert_eq!(list.len(), 2);
        assert!(!list.covers(&patterns(&["1"]), "one"));
        assert!(list.covers(&patterns(&["2"]), "two"));
        assert!(list.covers(&patterns(&["3"]), "three"));

        list.clear();
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut list = Blacklist::new(0);
        list.insert(&patterns(&["1"]), "one");
        assert_eq!(list.len(), 0);
    }
}
