//! Half-open timestamp intervals and their disjoint unions.

use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use crate::time::Timestamp;

/// A half-open interval `[start, end)` of timestamps.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeSpan {
    /// The canonical empty interval, rendered as `[0,0, 0,0)`.
    pub const EMPTY: Self = Self::new(Timestamp::ZERO, Timestamp::ZERO);
    /// All representable time.
    pub const EVERYTHING: Self = Self::new(Timestamp::MIN, Timestamp::MAX);

    #[must_use]
    pub const fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// The interval containing exactly `t`.
    #[must_use]
    pub const fn point(t: Timestamp) -> Self {
        Self::new(t, t.next())
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    #[must_use]
    pub fn contains(self, t: Timestamp) -> bool {
        self.start <= t && t < self.end
    }

    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        Self::new(self.start.max(other.start), self.end.min(other.end))
    }
}

impl Display for TimeSpan {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A union of half-open intervals.
///
/// Spans built through [`intersect`](Self::intersect) and
/// [`union`](Self::union) are sorted and non-overlapping. Construction via
/// [`push_raw`](Self::push_raw) preserves insertion order instead: the
/// validator renders read-your-own-write spans after the base spans, and
/// that order is part of the failure-string contract. All queries are
/// correct either way.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisjointTimeSpans(Vec<TimeSpan>);

impl DisjointTimeSpans {
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn everything() -> Self {
        Self(alloc::vec![TimeSpan::EVERYTHING])
    }

    /// The union containing exactly `t`.
    #[must_use]
    pub fn point(t: Timestamp) -> Self {
        Self(alloc::vec![TimeSpan::point(t)])
    }

    #[must_use]
    pub fn spans(&self) -> &[TimeSpan] {
        &self.0
    }

    /// Appends a span without normalization, preserving insertion order.
    /// Empty spans are dropped.
    pub fn push_raw(&mut self, span: TimeSpan) {
        if !span.is_empty() {
            self.0.push(span);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|s| s.is_empty())
    }

    #[must_use]
    pub fn contains(&self, t: Timestamp) -> bool {
        self.0.iter().any(|s| s.contains(t))
    }

    /// Pairwise intersection, sorted by start. Touching output spans are not
    /// coalesced, mirroring how the per-version validity spans are kept
    /// distinct in failure strings.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let mut out: Vec<TimeSpan> = Vec::new();
        for a in &self.0 {
            for b in &other.0 {
                let i = a.intersect(*b);
                if !i.is_empty() {
                    out.push(i);
                }
            }
        }
        out.sort_unstable_by_key(|s| (s.start, s.end));
        Self(out)
    }

    /// Sorted-merge union, coalescing overlapping and touching spans.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut all: Vec<TimeSpan> = self
            .0
            .iter()
            .chain(other.0.iter())
            .copied()
            .filter(|s| !s.is_empty())
            .collect();
        all.sort_unstable_by_key(|s| (s.start, s.end));
        let mut out: Vec<TimeSpan> = Vec::new();
        for span in all {
            match out.last_mut() {
                Some(last) if span.start <= last.end => {
                    last.end = last.end.max(span.end);
                }
                _ => out.push(span),
            }
        }
        Self(out)
    }
}

impl Display for DisjointTimeSpans {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{}", TimeSpan::EMPTY);
        }
        for (i, span) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{span}")?;
        }
        Ok(())
    }
}
