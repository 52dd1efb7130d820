//! BTree key index.

use crate::error::CoreResult;
use std::collections::BTreeMap;
use std::ops::Bound;
use zentry_codec::{KeyKind, LogicalKey, TaggedKey, Timestamp};

type HistoryKey = (LogicalKey, Timestamp, Timestamp);

/// BTree-based index for point lookups and ordered range scans.
///
/// `KeyIndex` supports:
/// - Lookup of the live offset for an exact tagged key
/// - Prefix scans over the serialized key order
/// - Per-fact history scans, oldest first
///
/// # Example
///
/// ```rust,ignore
/// let mut index = KeyIndex::new();
/// index.put(TaggedKey::current(key.clone()), 0)?;
/// assert_eq!(index.get(&TaggedKey::current(key)), Some(0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyIndex {
    /// Serialized key to (key, offset).
    entries: BTreeMap<String, (TaggedKey, u64)>,
    /// Historical entries by (logical key, valid_from, valid_to).
    history: BTreeMap<HistoryKey, u64>,
}

impl KeyIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live offset for `key`.
    #[must_use]
    pub fn get(&self, key: &TaggedKey) -> Option<u64> {
        let encoded = key.encode().ok()?;
        self.entries.get(&encoded).map(|(_, offset)| *offset)
    }

    /// Points `key` at `offset`, shadowing any earlier offset.
    ///
    /// Returns the previous offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be serialized.
    pub fn put(&mut self, key: TaggedKey, offset: u64) -> CoreResult<Option<u64>> {
        let encoded = key.encode()?;
        if let Some(history_key) = history_key(&key) {
            self.history.insert(history_key, offset);
        }
        Ok(self
            .entries
            .insert(encoded, (key, offset))
            .map(|(_, previous)| previous))
    }

    /// Removes `key`, returning its offset if it was live.
    pub fn remove(&mut self, key: &TaggedKey) -> Option<u64> {
        let encoded = key.encode().ok()?;
        let (_, offset) = self.entries.remove(&encoded)?;
        if let Some(history_key) = history_key(key) {
            self.history.remove(&history_key);
        }
        Some(offset)
    }

    /// Returns whether `key` is live.
    #[must_use]
    pub fn contains(&self, key: &TaggedKey) -> bool {
        self.get(key).is_some()
    }

    /// Returns entries whose serialized key starts with `prefix`, in order.
    pub fn range_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a TaggedKey, u64)> + 'a {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(encoded, _)| encoded.starts_with(prefix))
            .map(|(_, (key, offset))| (key, *offset))
    }

    /// Returns every live key of one kind, in serialized order.
    pub fn by_kind(&self, kind: KeyKind) -> impl Iterator<Item = (&TaggedKey, u64)> + '_ {
        self.range_prefix(kind.prefix())
    }

    /// Returns the live historical ranges of `key` as
    /// `(valid_from, valid_to, offset)`, oldest first.
    pub fn history<'a>(
        &'a self,
        key: &LogicalKey,
    ) -> impl Iterator<Item = (Timestamp, Timestamp, u64)> + 'a {
        let lowest = Timestamp::from_micros(i64::MIN);
        let highest = Timestamp::from_micros(i64::MAX);
        self.history
            .range((key.clone(), lowest, lowest)..=(key.clone(), highest, highest))
            .map(|((_, from, to), offset)| (*from, *to, *offset))
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of live historical keys.
    #[must_use]
    pub fn historical_len(&self) -> usize {
        self.history.len()
    }
}

fn history_key(key: &TaggedKey) -> Option<HistoryKey> {
    match key {
        TaggedKey::Historical {
            key,
            valid_from,
            valid_to,
        } => Some((key.clone(), *valid_from, *valid_to)),
        TaggedKey::Current(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logical(name: &str) -> LogicalKey {
        LogicalKey::new(name).unwrap()
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_micros(secs * 1_000_000)
    }

    fn hist(name: &str, from: i64, to: i64) -> TaggedKey {
        TaggedKey::historical(logical(name), ts(from), ts(to)).unwrap()
    }

    #[test]
    fn put_get_remove() {
        let mut index = KeyIndex::new();
        let key = TaggedKey::current(logical("A"));

        assert_eq!(index.put(key.clone(), 10).unwrap(), None);
        assert_eq!(index.get(&key), Some(10));
        assert_eq!(index.put(key.clone(), 42).unwrap(), Some(10));
        assert_eq!(index.get(&key), Some(42));
        assert_eq!(index.len(), 1);

        assert_eq!(index.remove(&key), Some(42));
        assert_eq!(index.get(&key), None);
        assert_eq!(index.remove(&key), None);
        assert!(index.is_empty());
    }

    #[test]
    fn kinds_are_separate_ranges() {
        let mut index = KeyIndex::new();
        index.put(hist("A", 1, 2), 3).unwrap();
        index.put(TaggedKey::current(logical("B")), 2).unwrap();
        index.put(TaggedKey::current(logical("A")), 1).unwrap();

        let current: Vec<_> = index.by_kind(KeyKind::Current).map(|(_, o)| o).collect();
        assert_eq!(current, vec![1, 2]);

        let historical: Vec<_> = index.by_kind(KeyKind::Historical).collect();
        assert_eq!(historical.len(), 1);
        assert_eq!(historical[0].0, &hist("A", 1, 2));
    }

    #[test]
    fn history_is_per_key_and_chronological() {
        let mut index = KeyIndex::new();
        index.put(hist("USD -> IDR", 20, 30), 3).unwrap();
        index.put(hist("EUR -> IDR", 5, 40), 9).unwrap();
        index.put(hist("USD -> IDR", 10, 20), 1).unwrap();
        index.put(hist("USD -> IDRX", 0, 1), 7).unwrap();

        let chain: Vec<_> = index.history(&logical("USD -> IDR")).collect();
        assert_eq!(chain, vec![(ts(10), ts(20), 1), (ts(20), ts(30), 3)]);
        assert_eq!(index.historical_len(), 4);
    }

    #[test]
    fn removing_historical_updates_history() {
        let mut index = KeyIndex::new();
        let key = hist("A", 1, 2);
        index.put(key.clone(), 5).unwrap();
        index.remove(&key);

        assert_eq!(index.history(&logical("A")).count(), 0);
        assert_eq!(index.historical_len(), 0);
    }
}
