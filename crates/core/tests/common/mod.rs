#![allow(dead_code)]

//! Builders for recorded histories, playing the role of the executor: they
//! fill in the result slots the validator reads back.

use kvoracle_core::history::types::{Operation, Outcome, Step};
use kvoracle_core::store::LogEntry;
use kvoracle_core::time::Timestamp;
use kvoracle_core::validate;

#[must_use]
pub fn ts(wall: i64) -> Timestamp {
    Timestamp::from_nanos(wall)
}

#[must_use]
pub fn kv(key: &str, wall: i64, value: &str) -> LogEntry {
    LogEntry::new(key, ts(wall), value)
}

#[must_use]
pub fn tombstone(key: &str, wall: i64) -> LogEntry {
    LogEntry::tombstone(key, ts(wall))
}

#[must_use]
pub fn step(op: Operation) -> Step {
    Step::new(op)
}

/// Sets the reported commit timestamp.
#[must_use]
pub fn with_ts(mut op: Operation, wall: i64) -> Operation {
    op.result_mut().ts = Some(ts(wall));
    op
}

fn finish(mut op: Operation, outcome: Outcome) -> Operation {
    let result = op.result_mut();
    result.outcome = outcome;
    // Most of the table commits at timestamp 1; cases that differ say so
    // via with_ts / ok_at.
    if result.ts.is_none() {
        result.ts = Some(ts(1));
    }
    op
}

/// Outcome `Ok`, defaulting the commit timestamp to 1.
#[must_use]
pub fn ok(op: Operation) -> Operation {
    finish(op, Outcome::Ok)
}

/// Outcome `Ok` at an explicit commit timestamp.
#[must_use]
pub fn ok_at(op: Operation, wall: i64) -> Operation {
    ok(with_ts(op, wall))
}

#[must_use]
pub fn ambiguous(op: Operation) -> Operation {
    finish(op, Outcome::Ambiguous)
}

#[must_use]
pub fn retryable(op: Operation) -> Operation {
    finish(op, Outcome::Retryable)
}

#[must_use]
pub fn failed(op: Operation) -> Operation {
    finish(op, Outcome::Failed)
}

/// Attaches a get's read value; the empty string reads as absent.
#[must_use]
pub fn read(mut op: Operation, value: &str) -> Operation {
    if let Operation::Get(get) = &mut op {
        get.value = if value.is_empty() {
            None
        } else {
            Some(value.as_bytes().to_vec())
        };
    }
    op
}

/// Attaches a scan's returned rows.
#[must_use]
pub fn rows(mut op: Operation, returned: &[(&str, &str)]) -> Operation {
    if let Operation::Scan(scan) = &mut op {
        scan.rows = returned
            .iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
            .collect();
    }
    op
}

/// Attaches a delete-range's reported deleted keys.
#[must_use]
pub fn deleted(mut op: Operation, keys: &[&str]) -> Operation {
    if let Operation::DeleteRange(dr) = &mut op {
        dr.deleted = keys.iter().map(|k| k.as_bytes().to_vec()).collect();
    }
    op
}

/// Runs the validator and asserts the rendered failures match exactly.
#[track_caller]
pub fn check(steps: &[Step], log: &[LogEntry], expected: &[&str]) {
    let failures = validate(steps, log).expect("well-formed history");
    let rendered: Vec<String> = failures.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, expected, "steps: {steps:?}\nlog: {log:?}");
}
