use std::collections::HashSet;

/// Identity keys already collected during the current run.
///
/// Keys are never evicted; a fresh set is created for every run.
#[derive(Debug, Default)]
pub struct SeenSet {
    keys: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Record `key`, returning true if it had not been seen before.
    ///
    /// Empty keys are rejected and never recorded.
    pub fn insert_new(&mut self, key: &str) -> bool {
        if key.is_empty() || self.keys.contains(key) {
            return false;
        }
        self.keys.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_new_is_test_and_set() {
        let mut seen = SeenSet::new();
        assert!(seen.insert_new("a"));
        assert!(!seen.insert_new("a"));
        assert!(seen.insert_new("b"));
        assert_eq!(seen.len(), 2);
        assert!(seen.contains("a"));
    }

    #[test]
    fn test_empty_key_is_never_recorded() {
        let mut seen = SeenSet::new();
        assert!(!seen.insert_new(""));
        assert!(!seen.insert_new(""));
        assert!(seen.is_empty());
    }
}
