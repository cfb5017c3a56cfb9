use alloc::vec::Vec;

use crate::time::Timestamp;

/// Error for inputs the validator cannot meaningfully check.
///
/// These are bugs in the test harness that produced the inputs, not
/// observed inconsistencies, and therefore surface as a hard error instead
/// of entries in the failure list.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// A log entry carries a timestamp at or below zero.
    VersionAtInvalidTimestamp { key: Vec<u8>, ts: Timestamp },
    /// One key carries two versions at the same timestamp.
    DuplicateVersion { key: Vec<u8>, ts: Timestamp },
    /// A transaction nested inside another transaction or batch.
    NestedTransaction,
}
