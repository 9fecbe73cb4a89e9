//! In-memory drone used when no flight controller is attached.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{BatteryStatus, DroneLink, Location};
use crate::mission::Waypoint;

const CONNECTION_PREFIXES: &[&str] = &["udp:", "udpin:", "udpout:", "tcp:", "/dev/", "COM"];

/// Battery drained per movement command, in percent.
const DRAIN_PER_COMMAND: f64 = 0.5;

#[derive(Debug)]
struct SimState {
    connection: Option<String>,
    armed: bool,
    home: Location,
    location: Location,
    battery_percent: f64,
    mission: Vec<Waypoint>,
}

impl SimState {
    fn drain(&mut self) {
        self.battery_percent = (self.battery_percent - DRAIN_PER_COMMAND).max(0.0);
    }
}

/// Simulated vehicle that accepts the usual connection strings and tracks position.
pub struct SimulatedDrone {
    state: Mutex<SimState>,
}

impl SimulatedDrone {
    /// Create a disarmed, disconnected drone parked at `home`.
    pub fn new(home: Location) -> Self {
        Self {
            state: Mutex::new(SimState {
                connection: None,
                armed: false,
                home,
                location: home,
                battery_percent: 100.0,
                mission: Vec::new(),
            }),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.connection.is_some()
    }

    /// The most recently uploaded mission plan.
    pub async fn last_mission(&self) -> Vec<Waypoint> {
        self.state.lock().await.mission.clone()
    }
}

impl Default for SimulatedDrone {
    fn default() -> Self {
        Self::new(Location {
            lat: 37.7749,
            lon: -122.4194,
            alt: 0.0,
        })
    }
}

#[async_trait]
impl DroneLink for SimulatedDrone {
    async fn connect(&self, connection_string: &str) -> anyhow::Result<bool> {
        let target = connection_string.trim();
        if target.is_empty() {
            return Ok(false);
        }
        if !CONNECTION_PREFIXES.iter().any(|p| target.starts_with(p)) {
            anyhow::bail!("Unsupported connection string '{}'", target);
        }
        let mut state = self.state.lock().await;
        tracing::info!("Simulated vehicle connected on {}", target);
        state.connection = Some(target.to_string());
        Ok(true)
    }

    async fn takeoff(&self, altitude: f64) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        if state.connection.is_none() || altitude <= 0.0 {
            return Ok(false);
        }
        tracing::info!("Arming motors");
        state.armed = true;
        tracing::info!("Taking off to {} m", altitude);
        state.location.alt = altitude;
        state.drain();
        tracing::info!("Altitude: {}", altitude);
        Ok(true)
    }

    async fn land(&self) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        if state.connection.is_none() {
            return Ok(false);
        }
        state.location.alt = 0.0;
        state.armed = false;
        state.drain();
        Ok(true)
    }

    async fn return_home(&self) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        if state.connection.is_none() {
            return Ok(false);
        }
        state.location.lat = state.home.lat;
        state.location.lon = state.home.lon;
        state.drain();
        Ok(true)
    }

    async fn fly_to(&self, lat: f64, lon: f64, alt: f64) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        if state.connection.is_none() || !state.armed {
            return Ok(false);
        }
        state.location = Location { lat, lon, alt };
        state.drain();
        Ok(true)
    }

    async fn get_location(&self) -> anyhow::Result<Location> {
        let state = self.state.lock().await;
        if state.connection.is_none() {
            anyhow::bail!("Not connected to a drone");
        }
        Ok(state.location)
    }

    async fn get_battery(&self) -> anyhow::Result<BatteryStatus> {
        let state = self.state.lock().await;
        if state.connection.is_none() {
            anyhow::bail!("Not connected to a drone");
        }
        Ok(BatteryStatus {
            voltage: 10.5 + 2.1 * state.battery_percent / 100.0,
            percent: state.battery_percent,
        })
    }

    async fn execute_mission_plan(&self, waypoints: &[Waypoint]) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        if state.connection.is_none() || waypoints.is_empty() {
            return Ok(false);
        }
        tracing::info!("Uploaded mission with {} waypoints", waypoints.len());
        state.mission = waypoints.to_vec();
        Ok(true)
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if let Some(conn) = state.connection.take() {
            tracing::info!("Simulated vehicle on {} disconnected", conn);
        }
        state.armed = false;
        Ok(())
    }
}
