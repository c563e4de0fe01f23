// ============================================================================
// encq-core/src/progress/cell.rs
// ============================================================================
//
// LATEST-WINS PROGRESS SLOT
//
// Progress samples arrive far faster than anyone wants to draw them, so they
// are not queued. The supervisor overwrites a single slot and readers pick up
// whatever is newest. A version counter lets a reader block until something
// changed since it last looked.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::job::JobId;
use crate::progress::ProgressSample;

/// The newest sample together with the job it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub job_id: JobId,
    pub sample: ProgressSample,
}

#[derive(Default)]
struct Slot {
    latest: Option<ProgressSnapshot>,
    version: u64,
}

/// Single-value progress slot shared between the supervisor and observers.
#[derive(Default)]
pub struct ProgressCell {
    slot: Mutex<Slot>,
    changed: Condvar,
}

impl ProgressCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored sample.
    pub fn publish(&self, snapshot: ProgressSnapshot) {
        let mut slot = self.slot.lock();
        slot.latest = Some(snapshot);
        slot.version += 1;
        self.changed.notify_all();
    }

    /// Empties the slot once a job is over.
    pub fn clear(&self) {
        let mut slot = self.slot.lock();
        if slot.latest.take().is_some() {
            slot.version += 1;
            self.changed.notify_all();
        }
    }

    pub fn latest(&self) -> Option<ProgressSnapshot> {
        self.slot.lock().latest.clone()
    }

    /// Monotonic counter bumped on every change.
    pub fn version(&self) -> u64 {
        self.slot.lock().version
    }

    /// Blocks until the version moves past `seen` or `timeout` elapses.
    ///
    /// Returns the new version and the slot content, or `None` on timeout.
    pub fn wait_newer(
        &self,
        seen: u64,
        timeout: Duration,
    ) -> Option<(u64, Option<ProgressSnapshot>)> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        while slot.version <= seen {
            if self.changed.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        (slot.version > seen).then(|| (slot.version, slot.latest.clone()))
    }
}
