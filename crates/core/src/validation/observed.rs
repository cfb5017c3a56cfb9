//! What the validator observed a unit doing, annotated with the timespans
//! at which each observation was possible, and the deterministic rendering
//! of those observations inside failure strings.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;

use crate::store::Version;
use crate::time::span::DisjointTimeSpans;
use crate::time::Timestamp;

/// A write (put or delete) the unit claims to have performed.
#[derive(Debug)]
pub(crate) struct ObservedWrite {
    pub key: Vec<u8>,
    /// `None` is a delete.
    pub value: Option<Vec<u8>>,
    /// Timestamp of the version this write was attributed to, once matched.
    pub ts: Option<Timestamp>,
    pub from_delete_range: bool,
}

impl ObservedWrite {
    pub(crate) const fn is_delete(&self) -> bool {
        self.value.is_none()
    }
}

/// A point read and the timespans at which its value was visible.
#[derive(Debug)]
pub(crate) struct ObservedRead {
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
    pub valid: DisjointTimeSpans,
}

/// One row a scan returned. Rows from a delete-range's implicit scan carry
/// no value; they only assert the key was present.
#[derive(Debug)]
pub(crate) struct ObservedScanRow {
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
    pub valid: DisjointTimeSpans,
}

/// A range read: per-row validity plus the gap, the timespans at which
/// every non-returned key in the span was absent.
#[derive(Debug)]
pub(crate) struct ObservedScan {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
    pub reverse: bool,
    pub from_delete_range: bool,
    pub rows: Vec<ObservedScanRow>,
    pub gap: DisjointTimeSpans,
}

#[derive(Debug)]
pub(crate) enum ObservedOp {
    Write(ObservedWrite),
    Read(ObservedRead),
    Scan(ObservedScan),
}

fn render_bytes(out: &mut String, bytes: &[u8]) {
    out.push_str(&String::from_utf8_lossy(bytes));
}

fn render_key(out: &mut String, key: &[u8]) {
    out.push('"');
    render_bytes(out, key);
    out.push('"');
}

pub(crate) fn render_quoted_key(key: &[u8]) -> String {
    let mut out = String::new();
    render_key(&mut out, key);
    out
}

fn render_write(out: &mut String, w: &ObservedWrite) {
    let tag = if !w.is_delete() {
        "[w]"
    } else if w.from_delete_range {
        "[dr.d]"
    } else {
        "[d]"
    };
    out.push_str(tag);
    render_key(out, &w.key);
    match w.ts {
        Some(ts) => {
            let _ = write!(out, ":{ts}");
        }
        None => out.push_str(":missing"),
    }
    out.push_str("->");
    match &w.value {
        Some(value) => render_bytes(out, value),
        None => out.push_str("<nil>"),
    }
}

fn render_read(out: &mut String, r: &ObservedRead) {
    out.push_str("[r]");
    render_key(out, &r.key);
    let _ = write!(out, ":{}->", r.valid);
    match &r.value {
        Some(value) => render_bytes(out, value),
        None => out.push_str("<nil>"),
    }
}

fn render_scan(out: &mut String, s: &ObservedScan) {
    let tag = if s.from_delete_range {
        "[dr.s]"
    } else if s.reverse {
        "[rs]"
    } else {
        "[s]"
    };
    out.push_str(tag);
    out.push('{');
    render_bytes(out, &s.start);
    out.push('-');
    render_bytes(out, &s.end);
    out.push_str("}:{");
    for (i, row) in s.rows.iter().enumerate() {
        let _ = write!(out, "{i}:{}, ", row.valid);
    }
    let _ = write!(out, "gap:{}}}->[", s.gap);
    for (i, row) in s.rows.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render_key(out, &row.key);
        if let Some(value) = &row.value {
            out.push(':');
            render_bytes(out, value);
        }
    }
    out.push(']');
}

/// Renders a unit's observations space-joined, in program order.
pub(crate) fn render_observed(obs: &[ObservedOp]) -> String {
    let mut out = String::new();
    for (i, o) in obs.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        match o {
            ObservedOp::Write(w) => render_write(&mut out, w),
            ObservedOp::Read(r) => render_read(&mut out, r),
            ObservedOp::Scan(s) => render_scan(&mut out, s),
        }
    }
    out
}

/// Renders a version never attributed to any write. Tombstones are
/// indistinguishable by content, so theirs is an `uncertain` timestamp.
pub(crate) fn render_extra(key: &[u8], version: &Version) -> String {
    let mut out = String::new();
    match &version.value {
        Some(value) => {
            out.push_str("[w]");
            render_key(&mut out, key);
            let _ = write!(&mut out, ":{}->", version.ts);
            render_bytes(&mut out, value);
        }
        None => {
            out.push_str("[d]");
            render_key(&mut out, key);
            out.push_str(":uncertain-><nil>");
        }
    }
    out
}
