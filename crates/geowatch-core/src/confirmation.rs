//! Debounced exit confirmation.
//!
//! Region exits reported near a boundary are noisy. When the exited geofence
//! has a trusted network and that network is still visible, the exit is not
//! reported; instead it is evaluated again after a delay, and keeps being
//! re-evaluated until the network disappears too. Entries are never debounced.

use std::time::Duration;

use tracing::{debug, warn};

use crate::geofence::{CircularRegion, Geofence};
use crate::network::NetworkInfoProvider;

/// Default delay before a deferred exit is evaluated again.
pub const DEFAULT_RECHECK_DELAY: Duration = Duration::from_secs(30);

/// Outcome of evaluating one exit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    /// Report the region as exited now.
    ConfirmedOutside,
    /// Stay silent and evaluate the same region again after `after`.
    Recheck {
        /// Delay before the next evaluation.
        after: Duration,
    },
}

/// Find the saved geofence a monitored region belongs to.
///
/// Matching is by exact equality of the region center with the stored
/// coordinate; the first match in working-list order wins.
#[must_use]
pub fn resolve_geofence<'a>(
    region: &CircularRegion,
    geofences: &'a [Geofence],
) -> Option<&'a Geofence> {
    geofences.iter().find(|g| g.coordinate == region.center)
}

/// Exit-confirmation rule with a fixed re-check delay.
#[derive(Debug, Clone, Copy)]
pub struct ExitConfirmation {
    recheck_delay: Duration,
}

impl Default for ExitConfirmation {
    fn default() -> Self {
        Self::new(DEFAULT_RECHECK_DELAY)
    }
}

impl ExitConfirmation {
    /// Create a rule that defers for `recheck_delay`.
    #[must_use]
    pub const fn new(recheck_delay: Duration) -> Self {
        Self { recheck_delay }
    }

    /// Delay used for deferred exits.
    #[must_use]
    pub const fn recheck_delay(&self) -> Duration {
        self.recheck_delay
    }

    /// Decide what to do with an exit from `region`.
    ///
    /// Unresolvable regions and geofences without a trusted network confirm
    /// immediately. A failed network query counts as the network being absent.
    pub fn evaluate(
        &self,
        region: &CircularRegion,
        geofences: &[Geofence],
        network: &dyn NetworkInfoProvider,
    ) -> ExitDecision {
        let Some(geofence) = resolve_geofence(region, geofences) else {
            debug!(region = %region.identifier, "exit from unknown region, confirming");
            return ExitDecision::ConfirmedOutside;
        };

        let Some(trusted) = geofence.trusted_network.as_deref() else {
            return ExitDecision::ConfirmedOutside;
        };

        let visible = match network.current_network_names() {
            Ok(names) => names.contains(trusted),
            Err(e) => {
                warn!(region = %region.identifier, error = %e, "network query failed, confirming exit");
                false
            }
        };

        if visible {
            debug!(
                region = %region.identifier,
                network = trusted,
                delay_secs = self.recheck_delay.as_secs(),
                "trusted network still visible, deferring exit"
            );
            ExitDecision::Recheck {
                after: self.recheck_delay,
            }
        } else {
            ExitDecision::ConfirmedOutside
        }
    }
}
