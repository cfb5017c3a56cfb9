//! Validation failures and their canonical text form.
//!
//! The strings are load-bearing: downstream test harnesses assert on them
//! verbatim, so every arm here is golden-tested against the oracle table in
//! `tests/validate.rs`.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use crate::time::Timestamp;
use crate::validation::observed::render_quoted_key;

/// A single observed inconsistency.
///
/// `unit` is the failing unit's qualified name (`committed txn`,
/// `ambiguous batch`, `uncommitted put`, ...); `observed` is the rendered
/// observation list in program order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A write of a committed unit has no matching version.
    MissingWrite { unit: String, observed: String },
    /// The unit's per-operation timespans have no common timestamp.
    NonAtomic { unit: String, observed: String },
    /// A write shadowed inside its own unit nevertheless materialized.
    OverwrittenWrite { unit: String, observed: String },
    /// The unit's writes materialized at a single timestamp, but not the
    /// one the executor reported.
    MismatchedWriteTimestamp { ts: Timestamp, observed: String },
    /// A retryable or rolled-back unit left writes behind.
    UncommittedHadWrites { unit: String, observed: String },
    /// An ambiguous unit contains deletes; tombstones cannot be attributed.
    AmbiguousDelete { observed: String },
    /// Scan rows violate the scan direction.
    ScanNotOrdered { observed: String },
    /// A scan returned a key outside its span.
    OutsideScanBounds { key: Vec<u8>, observed: String },
    /// A delete-range reported a key outside its span.
    OutsideDeleteRangeBounds { key: Vec<u8>, observed: String },
    /// A version never attributed to any write.
    ExtraWrite { observed: String },
}

impl Display for Failure {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::MissingWrite { unit, observed } => {
                write!(f, "{unit} missing write: {observed}")
            }
            Self::NonAtomic { unit, observed } => {
                write!(f, "{unit} non-atomic timestamps: {observed}")
            }
            Self::OverwrittenWrite { unit, observed } => {
                write!(f, "{unit} overwritten key had write: {observed}")
            }
            Self::MismatchedWriteTimestamp { ts, observed } => {
                write!(f, "mismatched write timestamp {ts}: {observed}")
            }
            Self::UncommittedHadWrites { unit, observed } => {
                write!(f, "{unit} had writes: {observed}")
            }
            Self::AmbiguousDelete { observed } => write!(
                f,
                "unable to validate delete operations in ambiguous transactions: {observed}"
            ),
            Self::ScanNotOrdered { observed } => {
                write!(f, "scan result not ordered correctly: {observed}")
            }
            Self::OutsideScanBounds { key, observed } => {
                write!(
                    f,
                    "key {} outside scan bounds: {observed}",
                    render_quoted_key(key)
                )
            }
            Self::OutsideDeleteRangeBounds { key, observed } => {
                write!(
                    f,
                    "key {} outside delete range bounds: {observed}",
                    render_quoted_key(key)
                )
            }
            Self::ExtraWrite { observed } => write!(f, "extra writes: {observed}"),
        }
    }
}
