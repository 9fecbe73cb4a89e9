//! Drone hardware collaborator.
//!
//! Flight control itself lives behind [`DroneLink`]; this crate only issues
//! commands and interprets their boolean results and errors.

mod sim;

pub use sim::SimulatedDrone;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::mission::Waypoint;

/// Global position (degrees, metres relative to home).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub voltage: f64,
    pub percent: f64,
}

/// Commands understood by the drone's hardware-abstraction layer.
///
/// `Ok(false)` means the vehicle refused the command; `Err` means the link failed.
#[async_trait]
pub trait DroneLink: Send + Sync {
    async fn connect(&self, connection_string: &str) -> anyhow::Result<bool>;

    async fn takeoff(&self, altitude: f64) -> anyhow::Result<bool>;

    async fn land(&self) -> anyhow::Result<bool>;

    async fn return_home(&self) -> anyhow::Result<bool>;

    async fn fly_to(&self, lat: f64, lon: f64, alt: f64) -> anyhow::Result<bool>;

    async fn get_location(&self) -> anyhow::Result<Location>;

    async fn get_battery(&self) -> anyhow::Result<BatteryStatus>;

    /// Upload a mission plan and start executing it.
    async fn execute_mission_plan(&self, waypoints: &[Waypoint]) -> anyhow::Result<bool>;

    async fn disconnect(&self) -> anyhow::Result<()>;
}
