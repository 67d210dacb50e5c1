//! The per-job state machine: `absent -> init -> admitted -> done`.
//!
//! Modeled explicitly rather than inferred from a `HashMap`'s presence/
//! absence alone, so an out-of-order call (e.g. `schedule` before `init`)
//! is rejected as the programming error it is, instead of silently
//! clobbering the ledger.

use std::collections::HashMap;

/// A job's position in the lifecycle. `Absent` is never stored explicitly;
/// it is the absence of a key in the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Init,
    Admitted { memory_mb: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition: {0}")]
pub struct IllegalTransition(pub &'static str);

/// The ledger and the per-job slot map, always mutated together so the
/// ledger invariant (`used_memory == sum of admitted slots`) can never be
/// observed broken.
#[derive(Default)]
pub struct Ledger {
    slots: HashMap<String, Slot>,
    used_memory: u64,
}

impl Ledger {
    pub fn used_memory(&self) -> u64 {
        self.used_memory
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.slots.contains_key(job_id)
    }

    /// `absent -> init`.
    pub fn on_init(&mut self, job_id: &str) -> Result<(), IllegalTransition> {
        if self.slots.contains_key(job_id) {
            return Err(IllegalTransition("init called on a job that already has a slot"));
        }
        self.slots.insert(job_id.to_string(), Slot::Init);
        Ok(())
    }

    /// `init -> admitted`. Adds `memory_mb` to the ledger. Must only be
    /// called while the coordinator holds its admission lock; this method
    /// performs no exclusion of its own against concurrent `schedule`
    /// calls for other job ids.
    pub fn on_schedule(&mut self, job_id: &str, memory_mb: u64) -> Result<(), IllegalTransition> {
        match self.slots.get(job_id) {
            Some(Slot::Init) => {
                self.slots.insert(job_id.to_string(), Slot::Admitted { memory_mb });
                self.used_memory += memory_mb;
                Ok(())
            }
            Some(Slot::Admitted { .. }) => {
                Err(IllegalTransition("schedule called on an already-admitted job"))
            }
            None => Err(IllegalTransition("schedule called with no intent slot")),
        }
    }

    /// `init -> absent` or `admitted -> absent`. Subtracts the job's
    /// committed memory (zero for an intent-only slot).
    pub fn on_done(&mut self, job_id: &str) -> Result<(), IllegalTransition> {
        match self.slots.remove(job_id) {
            Some(Slot::Admitted { memory_mb }) => {
                self.used_memory -= memory_mb;
                Ok(())
            }
            Some(Slot::Init) => Ok(()),
            None => Err(IllegalTransition("done called on a job with no slot")),
        }
    }
}
