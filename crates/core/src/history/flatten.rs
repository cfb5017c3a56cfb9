use alloc::vec::Vec;

use crate::history::error::HistoryError;
use crate::history::types::{Operation, Outcome, TxnMode};
use crate::time::Timestamp;

/// A step flattened to its atomicity boundary: the ordered leaf operations
/// of the innermost group, with the group's outcome and commit-timestamp
/// hint attached.
#[derive(Debug)]
pub(crate) struct Unit<'a> {
    /// Operation name for failure strings (`txn`, `batch`, `put`, ...).
    pub name: &'static str,
    pub outcome: Outcome,
    /// Commit timestamp reported for the whole unit, when known.
    pub ts: Option<Timestamp>,
    /// A rolled-back transaction never commits, whatever its outcome says.
    pub rollback: bool,
    /// Leaf operations in program order.
    pub leaves: Vec<&'a Operation>,
}

/// Flattens a step's operation tree into its unit.
///
/// Batches nested inside a transaction flatten transparently. Transactions
/// do not nest; encountering one below the top level is a harness bug.
pub(crate) fn flatten(op: &Operation) -> Result<Unit<'_>, HistoryError> {
    let mut leaves = Vec::new();
    let mut rollback = false;
    match op {
        Operation::Txn(txn) => {
            rollback = txn.mode == TxnMode::Rollback;
            collect_leaves(&txn.ops, &mut leaves)?;
        }
        Operation::Batch(batch) => collect_leaves(&batch.ops, &mut leaves)?,
        leaf => leaves.push(leaf),
    }
    let result = op.result();
    Ok(Unit {
        name: op.name(),
        outcome: result.outcome,
        ts: result.ts,
        rollback,
        leaves,
    })
}

fn collect_leaves<'a>(
    ops: &'a [Operation],
    out: &mut Vec<&'a Operation>,
) -> Result<(), HistoryError> {
    for op in ops {
        match op {
            Operation::Txn(_) => return Err(HistoryError::NestedTransaction),
            Operation::Batch(batch) => collect_leaves(&batch.ops, out)?,
            leaf => out.push(leaf),
        }
    }
    Ok(())
}
