//! Mission state, interrupt handling and the waypoint loop.

mod controller;
mod session;
mod state;
mod waypoint;

pub use controller::{InterruptOutcome, MissionController, MissionOutcome, MissionTiming};
pub use session::{InterruptToken, MissionSession, MissionSnapshot};
pub use state::{MissionState, MissionStatus, StatusTone, MISSION_LOG_CAPACITY};
pub use waypoint::{parse_waypoints, Waypoint, WaypointError};
