//! Reference oracle for MVCC transactional-history validation.
//!
//! `kvoracle_core` decides whether a recorded sequence of client-visible
//! operations against a multi-version key-value store -- each tagged with
//! its reported outcome -- is consistent with an atomic,
//! strict-serializable execution, given the full multi-version contents of
//! the store at test end. It is built as the checking half of a randomized
//! fault-injection harness: an operation generator and executor produce the
//! step log, a change-data-capture collector produces the final MVCC log,
//! and this crate is the judge.
//!
//! The two inputs are:
//!
//! 1. **Steps** -- an ordered sequence of [`Step`](history::types::Step)
//!    records: bare operations, batches, or transactions, each carrying the
//!    outcome the executor observed (success, ambiguous, retryable, failed)
//!    and, when known, the reported commit timestamp.
//! 2. **Final MVCC log** -- [`LogEntry`](store::LogEntry) triples of key,
//!    timestamp, and value, where an empty value is a tombstone.
//!
//! The output is a list of [`Failure`]s, empty when the history is
//! consistent. Each failure renders to a stable, human-readable string
//! (missing writes, extra writes, non-atomic timestamps, unordered scans,
//! ...) that downstream harnesses assert on verbatim.
//!
//! Validation is offline and single-threaded: for every unit the validator
//! matches claimed writes to observed versions, computes the timespans at
//! which every read was possible, and checks that a single commit timestamp
//! explains everything at once. Outcomes that are inherently ambiguous
//! (lost commit acknowledgements, deletes whose tombstones cannot be told
//! apart) are tolerated rather than misreported.
//!
//! # Entry point
//!
//! The main entry point is [`validate()`], which takes the step slice and
//! the log slice and returns either the failure list or a
//! [`HistoryError`](history::error::HistoryError) for malformed inputs.
//!
//! ```rust,ignore
//! use kvoracle_core::validate;
//!
//! let failures = validate(&steps, &log)?;
//! for failure in &failures {
//!     println!("{failure}");
//! }
//! ```
//!
//! # Crate features
//!
//! - **`serde`** -- enables `Serialize`/`Deserialize` derives on the input
//!   types (`Step`, `Operation`, `LogEntry`, `Timestamp`, ...).
//!
//! This crate is `no_std` compatible (requires `alloc`).

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod history;
pub mod store;
pub mod time;
pub mod validation;

pub use validation::{validate, Failure};
