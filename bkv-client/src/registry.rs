//! # Subscription Registry
//!
//! Purpose: Track the desired set of exact-channel and pattern
//! subscriptions, with reference counting so nested subscribe calls from
//! independent call sites compose safely.
//!
//! ## Design Principles
//! 1. **Ref-Counted Entries**: Subscribing twice to one channel requires
//!    two unsubscribes before it goes inactive; the distinct-entry count
//!    never double-counts.
//! 2. **No-Op Removal**: Removing an unknown entry returns the current
//!    count, never an error.
//! 3. **Snapshot Reads**: Consumers take an [`ActiveSet`] snapshot; the
//!    registry itself is never read while a lock is held across an await.

use std::collections::HashMap;

/// One subscription entry: an exact channel or a glob pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subscription {
    Exact(String),
    Pattern(String),
}

/// Snapshot of the distinct active subscriptions, used to provision
/// subscriber connections and to match incoming messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActiveSet {
    pub channels: Vec<String>,
    pub patterns: Vec<String>,
}

impl ActiveSet {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.patterns.is_empty()
    }
}

/// Ref-counted registry of exact and pattern subscriptions.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    channels: HashMap<String, usize>,
    patterns: HashMap<String, usize>,
}

impl SubscriptionRegistry {
    pub fn new() -> SubscriptionRegistry {
        SubscriptionRegistry::default()
    }

    /// Adds one reference to a subscription and returns the number of
    /// distinct active entries of the same kind after the mutation.
    pub fn add(&mut self, subscription: Subscription) -> usize {
        match subscription {
            Subscription::Exact(channel) => {
                *self.channels.entry(channel).or_insert(0) += 1;
                self.channels.len()
            }
            Subscription::Pattern(pattern) => {
                *self.patterns.entry(pattern).or_insert(0) += 1;
                self.patterns.len()
            }
        }
    }

    /// Drops one reference; the entry stays active until its count reaches
    /// zero. Removing an unknown entry is a no-op returning the current
    /// count.
    pub fn remove(&mut self, subscription: &Subscription) -> usize {
        match subscription {
            Subscription::Exact(channel) => {
                Self::drop_ref(&mut self.channels, channel);
                self.channels.len()
            }
            Subscription::Pattern(pattern) => {
                Self::drop_ref(&mut self.patterns, pattern);
                self.patterns.len()
            }
        }
    }

    fn drop_ref(map: &mut HashMap<String, usize>, name: &str) {
        if let Some(count) = map.get_mut(name) {
            *count -= 1;
            if *count == 0 {
                map.remove(name);
            }
        }
    }

    /// True when at least one reference to the exact channel is held.
    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    /// True when at least one reference to the pattern is held.
    pub fn has_pattern(&self, pattern: &str) -> bool {
        self.patterns.contains_key(pattern)
    }

    /// Number of distinct exact subscriptions.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of distinct pattern subscriptions.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Snapshot of the distinct active entries, sorted for deterministic
    /// connection provisioning and comparison.
    pub fn active_set(&self) -> ActiveSet {
        let mut channels: Vec<String> = self.channels.keys().cloned().collect();
        let mut patterns: Vec<String> = self.patterns.keys().cloned().collect();
        channels.sort();
        patterns.sort();
        ActiveSet { channels, patterns }
    }

    /// Drops every subscription, used by full disconnects.
    pub fn clear(&mut self) {
        self.channels.clear();
        self.patterns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_returns_distinct_count_per_kind() {
        let mut registry = SubscriptionRegistry::new();
        assert_eq!(registry.add(Subscription::Exact("a".into())), 1);
        assert_eq!(registry.add(Subscription::Exact("b".into())), 2);
        // Patterns are counted separately from exact channels.
        assert_eq!(registry.add(Subscription::Pattern("a.*".into())), 1);
    }

    #[test]
    fn duplicate_subscribes_are_ref_counted() {
        let mut registry = SubscriptionRegistry::new();
        assert_eq!(registry.add(Subscription::Exact("a".into())), 1);
        assert_eq!(registry.add(Subscription::Exact("a".into())), 1);
        // First unsubscribe drops one reference, channel stays active.
        assert_eq!(registry.remove(&Subscription::Exact("a".into())), 1);
        assert!(registry.has_channel("a"));
        // Second unsubscribe fully removes it.
        assert_eq!(registry.remove(&Subscription::Exact("a".into())), 0);
        assert!(!registry.has_channel("a"));
    }

    #[test]
    fn removing_unknown_entry_is_a_noop() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(Subscription::Exact("a".into()));
        assert_eq!(registry.remove(&Subscription::Exact("ghost".into())), 1);
        assert_eq!(registry.remove(&Subscription::Pattern("ghost.*".into())), 0);
    }

    #[test]
    fn active_set_is_sorted_and_distinct() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(Subscription::Exact("b".into()));
        registry.add(Subscription::Exact("a".into()));
        registry.add(Subscription::Exact("a".into()));
        registry.add(Subscription::Pattern("z.*".into()));
        let active = registry.active_set();
        assert_eq!(active.channels, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(active.patterns, vec!["z.*".to_string()]);
    }

    #[test]
    fn clear_empties_both_kinds() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(Subscription::Exact("a".into()));
        registry.add(Subscription::Pattern("p.*".into()));
        registry.clear();
        assert!(registry.active_set().is_empty());
    }
}
