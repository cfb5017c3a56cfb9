//! The observed store: the final multi-version contents of the key-value
//! store under test, indexed for matching committed writes to versions.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::ops::Bound;

use crate::history::error::HistoryError;
use crate::time::Timestamp;

/// A single `(key, timestamp, value)` triple from the final MVCC log.
///
/// An empty `value` is a tombstone.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub key: Vec<u8>,
    pub ts: Timestamp,
    pub value: Vec<u8>,
}

impl LogEntry {
    pub fn new(key: impl Into<Vec<u8>>, ts: Timestamp, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            ts,
            value: value.into(),
        }
    }

    pub fn tombstone(key: impl Into<Vec<u8>>, ts: Timestamp) -> Self {
        Self {
            key: key.into(),
            ts,
            value: Vec::new(),
        }
    }
}

/// One observed version of a key.
///
/// The version itself is immutable; `matched` is flipped once when a
/// committed write is attributed to it. Versions left unmatched at the end
/// of validation are extra writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub ts: Timestamp,
    /// `None` is a tombstone.
    pub value: Option<Vec<u8>>,
    matched: bool,
    /// Excluded from the extra-writes sweep without being attributed: set
    /// on tombstones a delete in an ambiguous unit may have produced. A
    /// later committed delete can still match the version.
    absolved: bool,
}

impl Version {
    #[must_use]
    pub const fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    #[must_use]
    pub const fn is_matched(&self) -> bool {
        self.matched
    }
}

/// The final multi-version contents of the store, keyed by key, with
/// versions in ascending timestamp order.
#[derive(Debug, Default)]
pub struct ObservedStore {
    versions: BTreeMap<Vec<u8>, Vec<Version>>,
}

impl ObservedStore {
    /// Builds the index from the raw log.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::VersionAtInvalidTimestamp`] for a version at
    /// or below [`Timestamp::ZERO`], and [`HistoryError::DuplicateVersion`]
    /// when one key carries two versions at the same timestamp.
    pub fn from_log(entries: &[LogEntry]) -> Result<Self, HistoryError> {
        let mut versions: BTreeMap<Vec<u8>, Vec<Version>> = BTreeMap::new();
        for entry in entries {
            if entry.ts <= Timestamp::ZERO {
                return Err(HistoryError::VersionAtInvalidTimestamp {
                    key: entry.key.clone(),
                    ts: entry.ts,
                });
            }
            let value = if entry.value.is_empty() {
                None
            } else {
                Some(entry.value.clone())
            };
            versions.entry(entry.key.clone()).or_default().push(Version {
                ts: entry.ts,
                value,
                matched: false,
                absolved: false,
            });
        }
        for (key, list) in &mut versions {
            list.sort_by_key(|v| v.ts);
            for pair in list.windows(2) {
                if pair[0].ts == pair[1].ts {
                    return Err(HistoryError::DuplicateVersion {
                        key: key.clone(),
                        ts: pair[0].ts,
                    });
                }
            }
        }
        Ok(Self { versions })
    }

    /// All versions of `key`, ascending by timestamp.
    #[must_use]
    pub fn versions(&self, key: &[u8]) -> &[Version] {
        self.versions.get(key).map_or(&[], Vec::as_slice)
    }

    /// The version visible at `ts` under MVCC read semantics: the newest
    /// version at or before `ts`. `None` when the key did not exist yet; a
    /// tombstone version means it was deleted.
    #[must_use]
    pub fn visible_at(&self, key: &[u8], ts: Timestamp) -> Option<&Version> {
        self.versions(key).iter().rev().find(|v| v.ts <= ts)
    }

    /// Keys with at least one version in `[start, end)`, in key order.
    pub fn keys_in_range<'a>(
        &'a self,
        start: &[u8],
        end: &[u8],
    ) -> impl Iterator<Item = &'a [u8]> {
        self.versions
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(key, _)| key.as_slice())
    }

    /// Attributes a committed put to a version: the earliest unmatched
    /// version of `key` with byte-equal value, preferring one at `hint`.
    /// Returns the matched version's timestamp.
    pub fn match_put(
        &mut self,
        key: &[u8],
        value: &[u8],
        hint: Option<Timestamp>,
    ) -> Option<Timestamp> {
        let list = self.versions.get_mut(key)?;
        let candidate = |v: &Version| !v.matched && v.value.as_deref() == Some(value);
        let idx = hint
            .and_then(|h| list.iter().position(|v| candidate(v) && v.ts == h))
            .or_else(|| list.iter().position(candidate))?;
        list[idx].matched = true;
        Some(list[idx].ts)
    }

    /// Whether an unmatched version of `key` with this value exists.
    #[must_use]
    pub fn has_unmatched_value(&self, key: &[u8], value: &[u8]) -> bool {
        self.versions(key)
            .iter()
            .any(|v| !v.matched && v.value.as_deref() == Some(value))
    }

    /// Attributes a committed delete to the unmatched tombstone of `key` at
    /// exactly `ts`. Tombstones carry no payload, so this is the only way a
    /// delete can be matched.
    pub fn match_tombstone(&mut self, key: &[u8], ts: Timestamp) -> bool {
        let Some(list) = self.versions.get_mut(key) else {
            return false;
        };
        match list
            .iter_mut()
            .find(|v| !v.matched && v.is_tombstone() && v.ts == ts)
        {
            Some(v) => {
                v.matched = true;
                true
            }
            None => false,
        }
    }

    /// Whether any tombstone exists for `key`, matched or not.
    #[must_use]
    pub fn has_tombstone(&self, key: &[u8]) -> bool {
        self.versions(key).iter().any(Version::is_tombstone)
    }

    /// Excuses every tombstone of `key` from the extra-writes sweep. Used
    /// when an ambiguous unit's deletes cannot be attributed: its key's
    /// tombstones must not surface as extra writes, but they stay available
    /// for a later committed delete to match.
    pub fn absolve_tombstones(&mut self, key: &[u8]) {
        if let Some(list) = self.versions.get_mut(key) {
            for v in list.iter_mut().filter(|v| v.is_tombstone()) {
                v.absolved = true;
            }
        }
    }

    /// Versions never attributed to any committed write and not absolved,
    /// in key order then timestamp order.
    pub fn unmatched(&self) -> impl Iterator<Item = (&[u8], &Version)> {
        self.versions.iter().flat_map(|(key, list)| {
            list.iter()
                .filter(|v| !v.matched && !v.absolved)
                .map(move |v| (key.as_slice(), v))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(wall: i64) -> Timestamp {
        Timestamp::from_nanos(wall)
    }

    fn store(entries: &[LogEntry]) -> ObservedStore {
        ObservedStore::from_log(entries).unwrap()
    }

    #[test]
    fn test_from_log_orders_versions() {
        let s = store(&[
            LogEntry::new("a", ts(3), "v3"),
            LogEntry::new("a", ts(1), "v1"),
            LogEntry::tombstone("a", ts(2)),
        ]);
        let versions: Vec<Timestamp> = s.versions(b"a").iter().map(|v| v.ts).collect();
        assert_eq!(versions, vec![ts(1), ts(2), ts(3)]);
        assert!(s.versions(b"a")[1].is_tombstone());
    }

    #[test]
    fn test_from_log_rejects_invalid_timestamps() {
        assert!(matches!(
            ObservedStore::from_log(&[LogEntry::new("a", Timestamp::ZERO, "v1")]),
            Err(HistoryError::VersionAtInvalidTimestamp { .. })
        ));
        assert!(matches!(
            ObservedStore::from_log(&[
                LogEntry::new("a", ts(1), "v1"),
                LogEntry::new("a", ts(1), "v2"),
            ]),
            Err(HistoryError::DuplicateVersion { .. })
        ));
    }

    #[test]
    fn test_visible_at() {
        let s = store(&[
            LogEntry::new("a", ts(2), "v1"),
            LogEntry::tombstone("a", ts(4)),
        ]);
        assert_eq!(s.visible_at(b"a", ts(1)), None);
        assert_eq!(s.visible_at(b"a", ts(2)).unwrap().ts, ts(2));
        assert_eq!(s.visible_at(b"a", ts(3)).unwrap().ts, ts(2));
        assert!(s.visible_at(b"a", ts(5)).unwrap().is_tombstone());
        assert_eq!(s.visible_at(b"b", ts(9)), None);
    }

    #[test]
    fn test_match_put_prefers_hint() {
        let mut s = store(&[
            LogEntry::new("a", ts(1), "v1"),
            LogEntry::new("a", ts(2), "v1"),
        ]);
        assert_eq!(s.match_put(b"a", b"v1", Some(ts(2))), Some(ts(2)));
        // The remaining unmatched copy is the earliest one.
        assert_eq!(s.match_put(b"a", b"v1", None), Some(ts(1)));
        assert_eq!(s.match_put(b"a", b"v1", None), None);
    }

    #[test]
    fn test_match_put_falls_back_to_earliest() {
        let mut s = store(&[LogEntry::new("a", ts(2), "v1")]);
        // A hint that matches nothing does not prevent the value match.
        assert_eq!(s.match_put(b"a", b"v1", Some(ts(1))), Some(ts(2)));
    }

    #[test]
    fn test_match_tombstone_is_exact() {
        let mut s = store(&[LogEntry::tombstone("a", ts(2))]);
        assert!(!s.match_tombstone(b"a", ts(1)));
        assert!(s.match_tombstone(b"a", ts(2)));
        assert!(!s.match_tombstone(b"a", ts(2)));
    }

    #[test]
    fn test_unmatched_and_absolve() {
        let mut s = store(&[
            LogEntry::new("a", ts(1), "v1"),
            LogEntry::tombstone("b", ts(2)),
        ]);
        assert_eq!(s.unmatched().count(), 2);
        s.absolve_tombstones(b"b");
        let left: Vec<&[u8]> = s.unmatched().map(|(k, _)| k).collect();
        assert_eq!(left, vec![b"a".as_slice()]);
        // Absolved tombstones can still be matched afterwards.
        assert!(s.match_tombstone(b"b", ts(2)));
    }

    #[test]
    fn test_keys_in_range() {
        let s = store(&[
            LogEntry::new("a", ts(1), "v1"),
            LogEntry::new("b", ts(1), "v2"),
            LogEntry::new("c", ts(1), "v3"),
        ]);
        let keys: Vec<&[u8]> = s.keys_in_range(b"a", b"c").collect();
        assert_eq!(keys, vec![b"a".as_slice(), b"b".as_slice()]);
    }
}
