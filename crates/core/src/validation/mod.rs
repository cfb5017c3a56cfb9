//! The validator: decides whether a recorded operation history is
//! consistent with an atomic, strict-serializable MVCC execution.
//!
//! The strategy, per unit (one bare operation, batch, or transaction): match
//! every claimed write to a version of the observed store, compute for every
//! read the timespans at which its result was visible, and prove a single
//! commit timestamp satisfying all of them at once exists. Reads inside a
//! unit that follow the unit's own writes validate against the store with
//! those writes' versions replaced by the unit's pending state.
//!
//! Everything is a pure function of the two inputs; failures come back as
//! [`Failure`] values whose `Display` form is the stable, test-facing
//! contract.

use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::ToString;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::history::error::HistoryError;
use crate::history::flatten::{flatten, Unit};
use crate::history::types::{Operation, Outcome, Step};
use crate::store::{LogEntry, ObservedStore};
use crate::time::span::{DisjointTimeSpans, TimeSpan};
use crate::time::Timestamp;
use crate::validation::observed::{
    render_extra, render_observed, ObservedOp, ObservedRead, ObservedScan, ObservedScanRow,
    ObservedWrite,
};

pub(crate) mod observed;
pub mod report;

pub use report::Failure;

/// Validates a recorded history against the final contents of the store.
///
/// Returns the failure list, empty when the history is consistent. Failures
/// appear in input-step order, with extra writes last; the list is a
/// deterministic function of the inputs.
///
/// # Errors
///
/// Returns a [`HistoryError`] only for malformed inputs (invalid or
/// duplicate version timestamps, nested transactions). Those are bugs in
/// the harness that produced the inputs, never observed inconsistencies.
pub fn validate(steps: &[Step], log: &[LogEntry]) -> Result<Vec<Failure>, HistoryError> {
    tracing::debug!(steps = steps.len(), versions = log.len(), "validating history");
    let mut validator = Validator {
        store: ObservedStore::from_log(log)?,
        failures: Vec::new(),
    };
    for step in steps {
        validator.check_step(&step.op)?;
    }
    validator.check_extra_writes();
    Ok(validator.failures)
}

struct Validator {
    store: ObservedStore,
    failures: Vec<Failure>,
}

/// Per-unit bookkeeping produced by write matching.
#[derive(Default)]
struct Matches {
    /// Versions attributed to this unit, per key.
    own: HashMap<Vec<u8>, Vec<Timestamp>>,
    /// Timestamp of each key's final write in the unit (`None` until
    /// matched). Reads of the unit's own state anchor here.
    final_ts: HashMap<Vec<u8>, Option<Timestamp>>,
    /// A shadowed write materialized at its own timestamp.
    overwritten: bool,
    /// Some key's final write never materialized.
    missing_last: bool,
    any_matched: bool,
    has_write: bool,
}

/// What a read claims about its key's state.
#[derive(Copy, Clone)]
enum Target<'a> {
    Value(&'a [u8]),
    Absent,
    Present,
}

impl Target<'_> {
    fn matches(self, value: Option<&[u8]>) -> bool {
        match self {
            Self::Value(expected) => value == Some(expected),
            Self::Absent => value.is_none(),
            Self::Present => value.is_some(),
        }
    }
}

impl Validator {
    fn check_step(&mut self, op: &Operation) -> Result<(), HistoryError> {
        let unit = flatten(op)?;
        tracing::trace!(unit = unit.name, leaves = unit.leaves.len(), "checking unit");
        if unit.rollback || matches!(unit.outcome, Outcome::Retryable | Outcome::Failed) {
            self.check_uncommitted(&unit);
        } else if unit.outcome == Outcome::Ambiguous {
            self.check_ambiguous(&unit);
        } else {
            self.check_committed(&unit, "committed");
        }
        Ok(())
    }

    /// A unit that reported success (or an ambiguous unit deemed committed):
    /// all writes must have materialized at one timestamp consistent with
    /// every read.
    fn check_committed(&mut self, unit: &Unit<'_>, status: &str) {
        let mut obs = observe(unit);
        let m = match_writes(&mut self.store, &mut obs, unit.ts, true);
        solve_spans(&self.store, &mut obs, &m);
        let observed = render_observed(&obs);
        if self.check_scans_locally(&obs, &observed) {
            return;
        }
        let name = format!("{status} {}", unit.name);
        if m.overwritten {
            self.failures.push(Failure::OverwrittenWrite {
                unit: name,
                observed,
            });
            return;
        }
        if m.missing_last {
            self.failures.push(Failure::MissingWrite {
                unit: name,
                observed,
            });
            return;
        }
        let valid = unit_valid_times(&obs);
        if valid.is_empty() {
            self.failures.push(Failure::NonAtomic {
                unit: name,
                observed,
            });
            return;
        }
        if m.has_write {
            if let Some(hint) = unit.ts {
                if !valid.contains(hint) {
                    self.failures.push(Failure::MismatchedWriteTimestamp {
                        ts: hint,
                        observed,
                    });
                }
            }
        }
    }

    /// An ambiguous unit may or may not have committed. Deletes make the
    /// question unanswerable whenever their key carries any tombstone, since
    /// tombstones have no payload to attribute; otherwise the unit is deemed
    /// committed exactly when one of its put values is present.
    fn check_ambiguous(&mut self, unit: &Unit<'_>) {
        let mut unverifiable_deletes: Vec<Vec<u8>> = Vec::new();
        let mut any_put_present = false;
        for op in &unit.leaves {
            match op {
                Operation::Put(p) => {
                    if self.store.has_unmatched_value(&p.key, &p.value) {
                        any_put_present = true;
                    }
                }
                Operation::Delete(d) => {
                    if self.store.has_tombstone(&d.key) {
                        unverifiable_deletes.push(d.key.clone());
                    }
                }
                Operation::DeleteRange(dr) => {
                    for key in &dr.deleted {
                        if self.store.has_tombstone(key) {
                            unverifiable_deletes.push(key.clone());
                        }
                    }
                }
                _ => {}
            }
        }
        if !unverifiable_deletes.is_empty() {
            let mut obs = observe(unit);
            let m = match_writes(&mut self.store, &mut obs, unit.ts, false);
            solve_spans(&self.store, &mut obs, &m);
            self.failures.push(Failure::AmbiguousDelete {
                observed: render_observed(&obs),
            });
            // The tombstones cannot be told apart from the ambiguous
            // deletes, so none of them may count as extra writes either.
            for key in &unverifiable_deletes {
                self.store.absolve_tombstones(key);
            }
            return;
        }
        if any_put_present {
            self.check_committed(unit, "ambiguous");
        }
    }

    /// A retryable or otherwise failed unit must have left no writes.
    fn check_uncommitted(&mut self, unit: &Unit<'_>) {
        let mut obs = observe(unit);
        let m = match_writes(&mut self.store, &mut obs, unit.ts, false);
        if m.any_matched {
            solve_spans(&self.store, &mut obs, &m);
            self.failures.push(Failure::UncommittedHadWrites {
                unit: format!("uncommitted {}", unit.name),
                observed: render_observed(&obs),
            });
        }
    }

    /// Scan-shape checks: returned keys inside the span, in scan direction.
    /// Violations are local defects that pre-empt the atomic check.
    fn check_scans_locally(&mut self, obs: &[ObservedOp], observed: &str) -> bool {
        let mut any = false;
        for o in obs {
            let ObservedOp::Scan(s) = o else { continue };
            let mut ordered = true;
            for (i, row) in s.rows.iter().enumerate() {
                if row.key.as_slice() < s.start.as_slice()
                    || row.key.as_slice() >= s.end.as_slice()
                {
                    any = true;
                    let key = row.key.clone();
                    self.failures.push(if s.from_delete_range {
                        Failure::OutsideDeleteRangeBounds {
                            key,
                            observed: observed.to_string(),
                        }
                    } else {
                        Failure::OutsideScanBounds {
                            key,
                            observed: observed.to_string(),
                        }
                    });
                }
                if i > 0 && ordered {
                    let prev = &s.rows[i - 1].key;
                    let in_order = if s.reverse {
                        row.key < *prev
                    } else {
                        row.key > *prev
                    };
                    if !in_order {
                        ordered = false;
                        any = true;
                        self.failures.push(Failure::ScanNotOrdered {
                            observed: observed.to_string(),
                        });
                    }
                }
            }
        }
        any
    }

    /// Every version no committed write was matched to is an extra write.
    fn check_extra_writes(&mut self) {
        let extra: Vec<Failure> = self
            .store
            .unmatched()
            .map(|(key, version)| Failure::ExtraWrite {
                observed: render_extra(key, version),
            })
            .collect();
        self.failures.extend(extra);
    }
}

/// Expands a unit's leaves into observations, in program order. A
/// delete-range contributes its implicit scan followed by one delete per
/// reported key. Reads with non-`Ok` outcomes assert nothing; writes are
/// always audited.
fn observe(unit: &Unit<'_>) -> Vec<ObservedOp> {
    let mut obs = Vec::new();
    for op in &unit.leaves {
        match op {
            Operation::Put(p) => obs.push(ObservedOp::Write(ObservedWrite {
                key: p.key.clone(),
                value: Some(p.value.clone()),
                ts: None,
                from_delete_range: false,
            })),
            Operation::Delete(d) => obs.push(ObservedOp::Write(ObservedWrite {
                key: d.key.clone(),
                value: None,
                ts: None,
                from_delete_range: false,
            })),
            Operation::Get(g) => {
                if g.result.outcome == Outcome::Ok {
                    obs.push(ObservedOp::Read(ObservedRead {
                        key: g.key.clone(),
                        value: g.value.clone(),
                        valid: DisjointTimeSpans::empty(),
                    }));
                }
            }
            Operation::Scan(s) => {
                if s.result.outcome == Outcome::Ok {
                    obs.push(ObservedOp::Scan(ObservedScan {
                        start: s.start.clone(),
                        end: s.end.clone(),
                        reverse: s.reverse,
                        from_delete_range: false,
                        rows: s
                            .rows
                            .iter()
                            .map(|(key, value)| ObservedScanRow {
                                key: key.clone(),
                                value: Some(value.clone()),
                                valid: DisjointTimeSpans::empty(),
                            })
                            .collect(),
                        gap: DisjointTimeSpans::empty(),
                    }));
                }
            }
            Operation::DeleteRange(dr) => {
                obs.push(ObservedOp::Scan(ObservedScan {
                    start: dr.start.clone(),
                    end: dr.end.clone(),
                    reverse: false,
                    from_delete_range: true,
                    rows: dr
                        .deleted
                        .iter()
                        .map(|key| ObservedScanRow {
                            key: key.clone(),
                            value: None,
                            valid: DisjointTimeSpans::empty(),
                        })
                        .collect(),
                    gap: DisjointTimeSpans::empty(),
                }));
                for key in &dr.deleted {
                    obs.push(ObservedOp::Write(ObservedWrite {
                        key: key.clone(),
                        value: None,
                        ts: None,
                        from_delete_range: true,
                    }));
                }
            }
            Operation::Batch(_) | Operation::Txn(_) => {}
        }
    }
    obs
}

/// Attributes the unit's writes to observed versions.
///
/// Only the final write per key is expected to materialize: it is matched
/// first (puts by value, deletes by tombstone at the unit's timestamp).
/// Earlier, shadowed puts are then probed; a hit means a version exists
/// that should have been overwritten in place. Shadowed deletes are
/// undetectable. With `match_deletes` unset (ambiguous and uncommitted
/// units) tombstones are never attributed.
fn match_writes(
    store: &mut ObservedStore,
    obs: &mut [ObservedOp],
    hint: Option<Timestamp>,
    match_deletes: bool,
) -> Matches {
    let mut last_idx: HashMap<Vec<u8>, usize> = HashMap::new();
    for (idx, o) in obs.iter().enumerate() {
        if let ObservedOp::Write(w) = o {
            last_idx.insert(w.key.clone(), idx);
        }
    }

    let mut m = Matches::default();
    for (idx, o) in obs.iter_mut().enumerate() {
        let ObservedOp::Write(w) = o else { continue };
        m.has_write = true;
        if last_idx.get(&w.key) != Some(&idx) {
            continue;
        }
        if w.is_delete() {
            if match_deletes {
                if let Some(h) = hint {
                    if store.match_tombstone(&w.key, h) {
                        w.ts = Some(h);
                    }
                }
                if w.ts.is_none() {
                    // The key's tombstones cannot be told apart from the one
                    // this delete should have produced; the missing-write
                    // failure accounts for them, extra-writes must not.
                    store.absolve_tombstones(&w.key);
                }
            }
        } else if let Some(value) = w.value.as_deref() {
            w.ts = store.match_put(&w.key, value, hint);
        }
        match w.ts {
            Some(ts) => {
                m.any_matched = true;
                m.own.entry(w.key.clone()).or_default().push(ts);
            }
            None => {
                if match_deletes || !w.is_delete() {
                    m.missing_last = true;
                }
            }
        }
        m.final_ts.insert(w.key.clone(), w.ts);
    }

    // Shadowed puts second: they should have no version of their own.
    for (idx, o) in obs.iter_mut().enumerate() {
        let ObservedOp::Write(w) = o else { continue };
        if last_idx.get(&w.key) == Some(&idx) || w.is_delete() {
            continue;
        }
        if let Some(value) = w.value.as_deref() {
            if let Some(ts) = store.match_put(&w.key, value, hint) {
                w.ts = Some(ts);
                m.any_matched = true;
                m.overwritten = true;
                m.own.entry(w.key.clone()).or_default().push(ts);
            }
        }
    }
    m
}

/// Computes validity timespans for every read observation, walking the
/// unit in program order so each read sees the pending state the unit had
/// built up by then.
fn solve_spans(store: &ObservedStore, obs: &mut [ObservedOp], m: &Matches) {
    let mut pending: HashMap<Vec<u8>, Option<Vec<u8>>> = HashMap::new();
    for o in obs.iter_mut() {
        match o {
            ObservedOp::Write(w) => {
                pending.insert(w.key.clone(), w.value.clone());
            }
            ObservedOp::Read(r) => {
                let target = r.value.as_deref().map_or(Target::Absent, Target::Value);
                r.valid = read_times(store, &r.key, target, m, pending.get(&r.key), true);
            }
            ObservedOp::Scan(s) => {
                for row in &mut s.rows {
                    let target = row.value.as_deref().map_or(Target::Present, Target::Value);
                    row.valid =
                        read_times(store, &row.key, target, m, pending.get(&row.key), false);
                }
                s.gap = gap_times(store, s, m, &pending);
            }
        }
    }
}

/// Timespans at which reading `target` at `key` was possible.
///
/// The unit's own matched versions are hidden from the view. Once the unit
/// has a pending write for the key the read compares against it: on
/// agreement the validity is the base spans plus a span anchored at the
/// key's final-write timestamp (bounded by the next surviving version for
/// point reads, open-ended for scans); on disagreement the pending state is
/// spliced in as a synthetic version and validity computed normally.
fn read_times(
    store: &ObservedStore,
    key: &[u8],
    target: Target<'_>,
    m: &Matches,
    pending: Option<&Option<Vec<u8>>>,
    bound_pending: bool,
) -> DisjointTimeSpans {
    let own = m.own.get(key).map_or(&[][..], Vec::as_slice);
    let kept: Vec<(Timestamp, Option<&[u8]>)> = store
        .versions(key)
        .iter()
        .filter(|v| !own.contains(&v.ts))
        .map(|v| (v.ts, v.value.as_deref()))
        .collect();

    let Some(pending_value) = pending else {
        return times_over(&kept, target);
    };
    let anchor = m
        .final_ts
        .get(key)
        .copied()
        .flatten()
        .unwrap_or(Timestamp::ZERO);
    if target.matches(pending_value.as_deref()) {
        let mut spans = times_over(&kept, target);
        let end = if bound_pending {
            kept.iter()
                .map(|v| v.0)
                .find(|ts| *ts > anchor)
                .unwrap_or(Timestamp::MAX)
        } else {
            Timestamp::MAX
        };
        spans.push_raw(TimeSpan::new(anchor, end));
        spans
    } else {
        let mut spliced = kept;
        let at = spliced
            .iter()
            .position(|v| v.0 > anchor)
            .unwrap_or(spliced.len());
        spliced.insert(at, (anchor, pending_value.as_deref()));
        times_over(&spliced, target)
    }
}

/// Validity runs over an ascending version list: each matching version is
/// visible from its own timestamp to the next version's, and an absent
/// target additionally covers everything before the first version.
fn times_over(versions: &[(Timestamp, Option<&[u8]>)], target: Target<'_>) -> DisjointTimeSpans {
    let mut spans = DisjointTimeSpans::empty();
    if matches!(target, Target::Absent) {
        let first = versions.first().map_or(Timestamp::MAX, |v| v.0);
        spans.push_raw(TimeSpan::new(Timestamp::MIN, first));
    }
    for (i, (ts, value)) in versions.iter().enumerate() {
        let next = versions.get(i + 1).map_or(Timestamp::MAX, |v| v.0);
        if target.matches(*value) {
            spans.push_raw(TimeSpan::new(*ts, next));
        }
    }
    spans
}

/// The gap: timespans at which every key of the scan's span that the scan
/// did not return was absent. No missing keys means no constraint.
fn gap_times(
    store: &ObservedStore,
    scan: &ObservedScan,
    m: &Matches,
    pending: &HashMap<Vec<u8>, Option<Vec<u8>>>,
) -> DisjointTimeSpans {
    let returned: BTreeSet<&[u8]> = scan.rows.iter().map(|r| r.key.as_slice()).collect();
    let mut candidates: BTreeSet<&[u8]> = store.keys_in_range(&scan.start, &scan.end).collect();
    for key in pending.keys() {
        if scan.start.as_slice() <= key.as_slice() && key.as_slice() < scan.end.as_slice() {
            candidates.insert(key.as_slice());
        }
    }
    let mut gap = DisjointTimeSpans::everything();
    for key in candidates {
        if returned.contains(key) {
            continue;
        }
        let absent = read_times(store, key, Target::Absent, m, pending.get(key), false);
        gap = gap.intersect(&absent);
    }
    gap
}

/// Intersection of every observation's timespans: non-empty exactly when
/// one commit timestamp explains the whole unit.
fn unit_valid_times(obs: &[ObservedOp]) -> DisjointTimeSpans {
    let mut valid = DisjointTimeSpans::everything();
    for o in obs {
        match o {
            ObservedOp::Write(w) => {
                if let Some(ts) = w.ts {
                    valid = valid.intersect(&DisjointTimeSpans::point(ts));
                }
            }
            ObservedOp::Read(r) => valid = valid.intersect(&r.valid),
            ObservedOp::Scan(s) => {
                for row in &s.rows {
                    valid = valid.intersect(&row.valid);
                }
                valid = valid.intersect(&s.gap);
            }
        }
    }
    valid
}
