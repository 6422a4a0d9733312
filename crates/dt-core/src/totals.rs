//! Accumulated active seconds per domain, and the store that persists them.

use std::collections::BTreeMap;
use std::error::Error as StdError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::DomainId;

/// Store key the totals mapping lives under.
pub const TOTALS_KEY: &str = "siteTimes";

/// Errors raised by a [`TotalsStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected a read or write.
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
    /// The stored value could not be decoded as a totals mapping.
    #[error("stored totals are corrupt: {0}")]
    Corrupt(String),
    /// Failure injected by [`MemoryStore`].
    #[error("store unavailable")]
    Unavailable,
}

/// Mapping from domain to accumulated whole seconds.
///
/// Serialized as a flat JSON object, e.g. `{"docs.rs": 120}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainTotals(BTreeMap<DomainId, u64>);

impl DomainTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds recorded for `domain`; a missing key counts as zero.
    pub fn get(&self, domain: &DomainId) -> u64 {
        self.0.get(domain).copied().unwrap_or(0)
    }

    /// Adds `seconds` to the total for `domain`.
    pub fn add(&mut self, domain: &DomainId, seconds: u64) {
        let total = self.0.entry(domain.clone()).or_insert(0);
        *total = total.saturating_add(seconds);
    }

    /// Adds every entry of `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        for (domain, seconds) in &other.0 {
            self.add(domain, *seconds);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Sum of all recorded seconds.
    pub fn total_seconds(&self) -> u64 {
        self.0.values().fold(0, |acc, s| acc.saturating_add(*s))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DomainId, u64)> {
        self.0.iter().map(|(domain, seconds)| (domain, *seconds))
    }

    /// Entries ordered by seconds descending, ties broken by domain name.
    pub fn ranked(&self) -> Vec<(&DomainId, u64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

impl FromIterator<(DomainId, u64)> for DomainTotals {
    fn from_iter<I: IntoIterator<Item = (DomainId, u64)>>(iter: I) -> Self {
        let mut totals = Self::new();
        for (domain, seconds) in iter {
            totals.add(&domain, seconds);
        }
        totals
    }
}

/// Durable home of the [`DomainTotals`] mapping.
///
/// Implementations must serialize reads and writes for a single writer and
/// survive process restarts. The accountant is the only writer.
pub trait TotalsStore {
    /// Reads the current totals. An absent mapping is an empty one.
    fn load(&self) -> Result<DomainTotals, StoreError>;

    /// Replaces the stored totals with `totals`.
    fn save(&mut self, totals: &DomainTotals) -> Result<(), StoreError>;

    /// Overwrites the stored totals with an empty mapping.
    fn reset(&mut self) -> Result<(), StoreError> {
        self.save(&DomainTotals::new())
    }
}

/// In-process [`TotalsStore`] with optional failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    totals: DomainTotals,
    fail_loads: bool,
    fail_saves: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `totals`.
    pub fn with_totals(totals: DomainTotals) -> Self {
        Self {
            totals,
            ..Self::default()
        }
    }

    /// Makes every subsequent load fail until cleared.
    pub fn fail_loads(&mut self, fail: bool) {
        self.fail_loads = fail;
    }

    /// Makes every subsequent save fail until cleared.
    pub fn fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    /// Current contents, bypassing failure injection.
    pub const fn totals(&self) -> &DomainTotals {
        &self.totals
    }

    /// Number of successful saves so far.
    pub const fn saves(&self) -> usize {
        self.saves
    }
}

impl TotalsStore for MemoryStore {
    fn load(&self) -> Result<DomainTotals, StoreError> {
        if self.fail_loads {
            return Err(StoreError::Unavailable);
        }
        Ok(self.totals.clone())
    }

    fn save(&mut self, totals: &DomainTotals) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Unavailable);
        }
        self.totals = totals.clone();
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(s: &str) -> DomainId {
        DomainId::new(s).unwrap()
    }

    #[test]
    fn missing_domain_counts_as_zero() {
        let totals = DomainTotals::new();
        assert_eq!(totals.get(&domain("a.com")), 0);
    }

    #[test]
    fn add_accumulates_and_merge_sums() {
        let mut totals = DomainTotals::new();
        totals.add(&domain("a.com"), 5);
        totals.add(&domain("a.com"), 3);

        let other: DomainTotals = [(domain("a.com"), 2), (domain("b.com"), 7)]
            .into_iter()
            .collect();
        totals.merge(&other);

        assert_eq!(totals.get(&domain("a.com")), 10);
        assert_eq!(totals.get(&domain("b.com")), 7);
        assert_eq!(totals.total_seconds(), 17);
        assert_eq!(totals.len(), 2);
    }

    #[test]
    fn add_saturates_instead_of_overflowing() {
        let mut totals = DomainTotals::new();
        totals.add(&domain("a.com"), u64::MAX);
        totals.add(&domain("a.com"), 1);
        assert_eq!(totals.get(&domain("a.com")), u64::MAX);
    }

    #[test]
    fn ranked_orders_by_seconds_then_name() {
        let totals: DomainTotals = [
            (domain("c.com"), 10),
            (domain("a.com"), 30),
            (domain("b.com"), 10),
        ]
        .into_iter()
        .collect();

        let ranked: Vec<_> = totals
            .ranked()
            .into_iter()
            .map(|(d, s)| (d.as_str().to_string(), s))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("a.com".to_string(), 30),
                ("b.com".to_string(), 10),
                ("c.com".to_string(), 10),
            ]
        );
    }

    #[test]
    fn totals_serialize_as_flat_object() {
        let totals: DomainTotals = [(domain("a.com"), 5), (domain("b.com"), 3)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&totals).unwrap();
        assert_eq!(json, r#"{"a.com":5,"b.com":3}"#);

        let parsed: DomainTotals = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, totals);
    }

    #[test]
    fn totals_reject_negative_seconds_and_empty_keys() {
        assert!(serde_json::from_str::<DomainTotals>(r#"{"a.com":-1}"#).is_err());
        assert!(serde_json::from_str::<DomainTotals>(r#"{"":1}"#).is_err());
    }

    #[test]
    fn memory_store_reset_clears_everything() {
        let mut store =
            MemoryStore::with_totals([(domain("a.com"), 5)].into_iter().collect());
        store.reset().unwrap();
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn memory_store_injects_failures() {
        let mut store = MemoryStore::new();
        store.fail_saves(true);
        assert!(matches!(
            store.save(&DomainTotals::new()),
            Err(StoreError::Unavailable)
        ));
        store.fail_loads(true);
        assert!(store.load().is_err());
        assert_eq!(store.saves(), 0);
    }
}
