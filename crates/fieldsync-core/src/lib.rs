pub mod clock;
pub mod clock_in;
pub mod config;
pub mod connectivity;
pub mod geofence;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, SystemClock};
pub use clock_in::{ClockInError, ClockInOutcome, ClockInService};
pub use connectivity::{spawn_reachability_probe, ConnectivitySignal, WatchConnectivity};
pub use geofence::{
    haversine_distance, FixedPositionProvider, GeofenceChecker, GeofenceError, GeofenceResult,
    Position, PositionProvider, PositionRequest, PositionUnavailable, UnavailablePositionProvider,
};
pub use sync::{DrainOutcome, SkipReason, Subscription, SyncOrchestrator, SyncStatus};
