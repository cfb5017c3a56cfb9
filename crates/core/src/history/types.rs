use alloc::vec::Vec;

use ::derive_more::From;

use crate::time::Timestamp;

/// Outcome reported by the executor for an operation or unit.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operation succeeded.
    Ok,
    /// The operation may or may not have been applied (e.g. the commit
    /// acknowledgement was lost).
    Ambiguous,
    /// The operation was retried and is guaranteed not to have been applied.
    Retryable,
    /// Any other error; the operation was not applied.
    Failed,
}

/// The result slot shared by every operation: the reported outcome plus the
/// commit timestamp, when the executor learned one.
///
/// Written exactly once by the executor, read many times by the validator.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpResult {
    pub outcome: Outcome,
    pub ts: Option<Timestamp>,
}

impl OpResult {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            outcome: Outcome::Ok,
            ts: None,
        }
    }
}

impl Default for OpResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// A point read, with the value it reported (`None` when the key was
/// absent or deleted).
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOp {
    pub key: Vec<u8>,
    pub value: Option<Vec<u8>>,
    pub result: OpResult,
}

/// A range read over `[start, end)`, with the rows it reported in the order
/// it reported them.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOp {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
    pub reverse: bool,
    pub rows: Vec<(Vec<u8>, Vec<u8>)>,
    pub result: OpResult,
}

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOp {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub result: OpResult,
}

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOp {
    pub key: Vec<u8>,
    pub result: OpResult,
}

/// A ranged delete over `[start, end)`, with the keys it reported deleting.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRangeOp {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
    pub deleted: Vec<Vec<u8>>,
    pub result: OpResult,
}

/// A non-transactional group of operations.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOp {
    pub ops: Vec<Operation>,
    pub result: OpResult,
}

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxnMode {
    Commit,
    Rollback,
}

/// An atomic group of operations: all effects must land at one timestamp.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnOp {
    pub mode: TxnMode,
    pub ops: Vec<Operation>,
    pub result: OpResult,
}

/// One recorded client-visible operation.
///
/// A tagged variant tree: groups (`Batch`, `Txn`) contain further
/// operations, everything else is a leaf. The shared result slot is a field
/// on each variant payload.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum Operation {
    Get(GetOp),
    Scan(ScanOp),
    Put(PutOp),
    Delete(DeleteOp),
    DeleteRange(DeleteRangeOp),
    Batch(BatchOp),
    Txn(TxnOp),
}

impl Operation {
    /// A get that reported the key absent. Attach the read value through
    /// [`GetOp`]'s public fields or a test helper.
    pub fn get(key: impl Into<Vec<u8>>) -> Self {
        GetOp {
            key: key.into(),
            value: None,
            result: OpResult::ok(),
        }
        .into()
    }

    pub fn scan(start: impl Into<Vec<u8>>, end: impl Into<Vec<u8>>) -> Self {
        ScanOp {
            start: start.into(),
            end: end.into(),
            reverse: false,
            rows: Vec::new(),
            result: OpResult::ok(),
        }
        .into()
    }

    pub fn reverse_scan(start: impl Into<Vec<u8>>, end: impl Into<Vec<u8>>) -> Self {
        ScanOp {
            start: start.into(),
            end: end.into(),
            reverse: true,
            rows: Vec::new(),
            result: OpResult::ok(),
        }
        .into()
    }

    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        PutOp {
            key: key.into(),
            value: value.into(),
            result: OpResult::ok(),
        }
        .into()
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        DeleteOp {
            key: key.into(),
            result: OpResult::ok(),
        }
        .into()
    }

    pub fn delete_range(start: impl Into<Vec<u8>>, end: impl Into<Vec<u8>>) -> Self {
        DeleteRangeOp {
            start: start.into(),
            end: end.into(),
            deleted: Vec::new(),
            result: OpResult::ok(),
        }
        .into()
    }

    #[must_use]
    pub fn batch(ops: Vec<Self>) -> Self {
        BatchOp {
            ops,
            result: OpResult::ok(),
        }
        .into()
    }

    #[must_use]
    pub fn txn(mode: TxnMode, ops: Vec<Self>) -> Self {
        TxnOp {
            mode,
            ops,
            result: OpResult::ok(),
        }
        .into()
    }

    /// The operation's name as it appears in failure strings.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Get(_) => "get",
            Self::Scan(s) => {
                if s.reverse {
                    "reverse scan"
                } else {
                    "scan"
                }
            }
            Self::Put(_) => "put",
            Self::Delete(_) => "delete",
            Self::DeleteRange(_) => "deleteRange",
            Self::Batch(_) => "batch",
            Self::Txn(_) => "txn",
        }
    }

    #[must_use]
    pub const fn result(&self) -> &OpResult {
        match self {
            Self::Get(o) => &o.result,
            Self::Scan(o) => &o.result,
            Self::Put(o) => &o.result,
            Self::Delete(o) => &o.result,
            Self::DeleteRange(o) => &o.result,
            Self::Batch(o) => &o.result,
            Self::Txn(o) => &o.result,
        }
    }

    pub fn result_mut(&mut self) -> &mut OpResult {
        match self {
            Self::Get(o) => &mut o.result,
            Self::Scan(o) => &mut o.result,
            Self::Put(o) => &mut o.result,
            Self::Delete(o) => &mut o.result,
            Self::DeleteRange(o) => &mut o.result,
            Self::Batch(o) => &mut o.result,
            Self::Txn(o) => &mut o.result,
        }
    }
}

/// The top-level unit of the recorded history: one operation tree with its
/// outcome. Steps are validated in input order, but the validator does not
/// assume that order matches commit order.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub op: Operation,
}

impl Step {
    #[must_use]
    pub const fn new(op: Operation) -> Self {
        Self { op }
    }
}
