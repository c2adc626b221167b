//! Network reachability status relay.
//!
//! The OS primitive lives behind [`ReachabilitySource`]; platform glue feeds
//! its change callbacks into [`ReachabilityMonitor::handle_flags`]. Listeners
//! observe transitions either through a single replaceable callback or by
//! subscribing to the monitor's broadcast channel. Trust evaluation does not
//! depend on any of this.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use super::types::EngineDefaults;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReachabilityStatus {
    #[default]
    Unknown,
    NotReachable,
    ReachableViaCellular,
    ReachableViaWiFi,
}

/// Raw reachability flags as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReachabilityFlags {
    pub reachable: bool,
    pub connection_required: bool,
    pub connection_on_traffic: bool,
    pub connection_on_demand: bool,
    pub intervention_required: bool,
    pub is_cellular: bool,
}

impl ReachabilityStatus {
    pub fn from_flags(flags: ReachabilityFlags) -> Self {
        let can_connect_automatically = flags.connection_on_demand || flags.connection_on_traffic;
        let can_connect_without_user = can_connect_automatically && !flags.intervention_required;
        let network_reachable =
            flags.reachable && (!flags.connection_required || can_connect_without_user);

        if !network_reachable {
            ReachabilityStatus::NotReachable
        } else if flags.is_cellular {
            ReachabilityStatus::ReachableViaCellular
        } else {
            ReachabilityStatus::ReachableViaWiFi
        }
    }

    pub fn is_reachable(self) -> bool {
        self.is_reachable_via_cellular() || self.is_reachable_via_wifi()
    }

    pub fn is_reachable_via_cellular(self) -> bool {
        self == ReachabilityStatus::ReachableViaCellular
    }

    pub fn is_reachable_via_wifi(self) -> bool {
        self == ReachabilityStatus::ReachableViaWiFi
    }
}

impl fmt::Display for ReachabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReachabilityStatus::Unknown => "Unknown",
            ReachabilityStatus::NotReachable => "Not Reachable",
            ReachabilityStatus::ReachableViaCellular => "Reachable via Cellular",
            ReachabilityStatus::ReachableViaWiFi => "Reachable via WiFi",
        })
    }
}

/// Payload broadcast on every status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachabilityChange {
    pub status: ReachabilityStatus,
}

/// OS reachability primitive.
pub trait ReachabilitySource: Send + Sync {
    /// Current flags, or `None` when the OS cannot tell yet.
    fn current_flags(&self) -> Option<ReachabilityFlags>;
}

pub type StatusCallback = Arc<dyn Fn(ReachabilityStatus) + Send + Sync>;

struct MonitorState {
    active: bool,
    status: ReachabilityStatus,
    callback: Option<StatusCallback>,
}

pub struct ReachabilityMonitor {
    source: Arc<dyn ReachabilitySource>,
    state: Mutex<MonitorState>,
    // Held across a status update and its delivery so listeners see
    // transitions in the order they were stored.
    delivery: Mutex<()>,
    notifier: broadcast::Sender<ReachabilityChange>,
}

impl fmt::Debug for ReachabilityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ReachabilityMonitor")
            .field("active", &state.active)
            .field("status", &state.status)
            .field("has_callback", &state.callback.is_some())
            .finish()
    }
}

impl ReachabilityMonitor {
    /// Monitor with its own broadcast channel; see [`Self::subscribe`].
    pub fn new(source: Arc<dyn ReachabilitySource>) -> Self {
        let (notifier, _) = broadcast::channel(EngineDefaults::REACHABILITY_CHANNEL_CAPACITY);
        Self::with_notifier(source, notifier)
    }

    /// Monitor publishing into a channel owned by the caller.
    pub fn with_notifier(
        source: Arc<dyn ReachabilitySource>,
        notifier: broadcast::Sender<ReachabilityChange>,
    ) -> Self {
        Self {
            source,
            state: Mutex::new(MonitorState {
                active: false,
                status: ReachabilityStatus::Unknown,
                callback: None,
            }),
            delivery: Mutex::new(()),
            notifier,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReachabilityChange> {
        self.notifier.subscribe()
    }

    /// Replace (or clear) the status change callback.
    ///
    /// Callbacks run one at a time, in transition order. They may query the
    /// monitor but must not call `start` or `handle_flags` on it.
    pub fn set_status_change_callback(&self, callback: Option<StatusCallback>) {
        self.lock().callback = callback;
    }

    pub fn status(&self) -> ReachabilityStatus {
        self.lock().status
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn is_reachable(&self) -> bool {
        self.status().is_reachable()
    }

    /// Start relaying and report the status the source currently sees.
    pub fn start(&self) {
        {
            let mut state = self.lock();
            if state.active {
                return;
            }
            state.active = true;
        }
        debug!("reachability monitoring started");
        if let Some(flags) = self.source.current_flags() {
            self.publish(ReachabilityStatus::from_flags(flags), true);
        }
    }

    pub fn stop(&self) {
        let mut state = self.lock();
        if state.active {
            state.active = false;
            debug!("reachability monitoring stopped");
        }
    }

    /// Entry point for the OS change callback. Ignored while stopped.
    pub fn handle_flags(&self, flags: ReachabilityFlags) {
        self.publish(ReachabilityStatus::from_flags(flags), false);
    }

    fn publish(&self, status: ReachabilityStatus, force: bool) {
        let _delivery = self.delivery.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let callback = {
            let mut state = self.lock();
            if !state.active {
                trace!(%status, "reachability update while stopped; ignoring");
                return;
            }
            if state.status == status && !force {
                return;
            }
            state.status = status;
            state.callback.clone()
        };

        debug!(%status, "reachability changed");
        if let Some(callback) = callback {
            callback(status);
        }
        // No subscribers is not an error for a relay.
        let _ = self.notifier.send(ReachabilityChange { status });
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
