//! Post-commit entry lifecycle seam.

use arbordir_types::{Dn, Entry, ResultCode};

/// Receiver of entry lifecycle outcomes from the operation pipeline.
///
/// The pipeline invokes each method at most once per committed operation, on
/// whichever worker thread performed the commit. Implementations must treat
/// any result code other than success, or a missing required snapshot, as a
/// no-op, and must never propagate a failure back to the caller: by the time
/// a hook runs the triggering operation has committed and cannot be rolled
/// back.
pub trait EntryEventHandler: Send + Sync {
    /// An entry (and implicitly its whole subtree) was deleted.
    fn on_entry_deleted(&self, result: ResultCode, entry_dn: &Dn);

    /// An entry's attributes changed; its DN did not. `old` is the pre-modify
    /// snapshot when the pipeline had one available.
    fn on_entry_modified(&self, result: ResultCode, old: Option<&Entry>, new: &Entry);

    /// An entry was renamed (modify-DN), implicitly moving its subtree.
    fn on_entry_renamed(&self, result: ResultCode, old: Option<&Entry>, new: Option<&Entry>);
}
