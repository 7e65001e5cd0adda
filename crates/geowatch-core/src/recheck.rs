//! Deferred exit re-checks.
//!
//! Each pending re-check is a tokio task that sleeps and then posts a
//! [`SchedulerEvent::RecheckDue`] back onto the scheduler queue. Tasks are
//! keyed by region identifier, at most one per region, and carry a generation
//! so a firing that raced with cancellation is recognised as stale.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::geofence::CircularRegion;
use crate::scheduler::SchedulerEvent;

#[derive(Debug)]
struct RecheckTask {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Pending re-check tasks keyed by region identifier.
#[derive(Debug, Default)]
pub struct RecheckTasks {
    tasks: HashMap<String, RecheckTask>,
    next_generation: u64,
}

impl RecheckTasks {
    /// Create an empty task map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a re-check of `region` after `delay`, replacing any pending one.
    ///
    /// Returns the generation the firing will carry. Must be called from
    /// within a tokio runtime.
    pub fn schedule(
        &mut self,
        region: CircularRegion,
        delay: Duration,
        events: mpsc::Sender<SchedulerEvent>,
    ) -> u64 {
        self.cancel(&region.identifier);

        self.next_generation += 1;
        let generation = self.next_generation;
        let identifier = region.identifier.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Closed queue means the scheduler is gone; nothing left to notify.
            let _ = events
                .send(SchedulerEvent::RecheckDue { region, generation })
                .await;
        });

        debug!(region = %identifier, generation, "re-check armed");
        self.tasks
            .insert(identifier, RecheckTask { generation, handle });
        generation
    }

    /// Cancel the pending re-check for `identifier`, if any.
    pub fn cancel(&mut self, identifier: &str) -> bool {
        self.tasks.remove(identifier).is_some_and(|task| {
            task.handle.abort();
            debug!(region = %identifier, generation = task.generation, "re-check cancelled");
            true
        })
    }

    /// Claim a firing: `true` only if it is the current task for `identifier`.
    ///
    /// A claimed task is removed from the map.
    pub fn take_due(&mut self, identifier: &str, generation: u64) -> bool {
        match self.tasks.get(identifier) {
            Some(task) if task.generation == generation => {
                self.tasks.remove(identifier);
                true
            }
            _ => false,
        }
    }

    /// Whether a re-check is pending for `identifier`.
    #[must_use]
    pub fn is_pending(&self, identifier: &str) -> bool {
        self.tasks.contains_key(identifier)
    }

    /// Identifiers with a pending re-check, sorted.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = self.tasks.keys().cloned().collect();
        identifiers.sort();
        identifiers
    }

    /// Number of pending re-checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel everything.
    pub fn cancel_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.handle.abort();
        }
    }
}

impl Drop for RecheckTasks {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
