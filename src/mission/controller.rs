//! Drone-control operations and the interruptible waypoint loop.
//!
//! Every operation takes the caller's [`MissionSession`], reports progress
//! through its status log, and returns a user-facing message. Collaborator
//! failures become an `ERROR` status, never an error value.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::session::MissionSession;
use super::state::MissionStatus;
use super::waypoint::Waypoint;
use crate::drone::DroneLink;

/// Simulated delays used by the mission loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionTiming {
    /// Time spent flying each leg.
    pub transit_delay: Duration,
    /// Wait after a return-to-home before reporting.
    pub settle_delay: Duration,
}

impl Default for MissionTiming {
    fn default() -> Self {
        Self {
            transit_delay: Duration::from_secs(2),
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// How a waypoint mission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionOutcome {
    /// Interrupt was pending before the drone was contacted.
    Aborted,
    /// Every waypoint was reached.
    Completed { total: usize },
    /// Stopped at a waypoint boundary; `completed` legs were flown.
    Interrupted { completed: usize, total: usize },
    Failed(String),
}

impl MissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

impl fmt::Display for MissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted => write!(f, "Mission cancelled due to an interrupt request."),
            Self::Completed { total } => {
                write!(f, "Mission complete: all {} waypoints reached.", total)
            }
            Self::Interrupted { completed, total } => write!(
                f,
                "Mission interrupted after {}/{} waypoints. Drone returned to base.",
                completed, total
            ),
            Self::Failed(reason) => write!(f, "Mission execution failed: {}", reason),
        }
    }
}

/// Result of the externally triggered abort path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptOutcome {
    NotInProgress,
    Aborted,
    Failed(String),
}

impl fmt::Display for InterruptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInProgress => write!(f, "No mission in progress to interrupt."),
            Self::Aborted => write!(f, "Mission aborted. Drone returned to base."),
            Self::Failed(reason) => write!(f, "Error during interrupt: {}", reason),
        }
    }
}

/// Issues drone commands and keeps the session's mission state in step.
pub struct MissionController {
    drone: Arc<dyn DroneLink>,
    timing: MissionTiming,
}

impl MissionController {
    pub fn new(drone: Arc<dyn DroneLink>, timing: MissionTiming) -> Self {
        Self { drone, timing }
    }

    pub async fn connect(&self, session: &MissionSession, connection_string: &str) -> String {
        session.set_in_progress(true).await;
        session
            .update_status(
                MissionStatus::Connecting,
                format!("Connecting to drone at {}", connection_string),
            )
            .await;

        let result = async {
            if !self.drone.connect(connection_string).await? {
                return Ok(None);
            }
            let location = self.drone.get_location().await?;
            let battery = self.drone.get_battery().await?;
            anyhow::Ok(Some((location, battery)))
        }
        .await;

        match result {
            Ok(Some((location, battery))) => {
                session
                    .update_status(MissionStatus::Connected, "Drone connected successfully")
                    .await;
                json!({
                    "status": "connected",
                    "location": location,
                    "battery": battery,
                })
                .to_string()
            }
            Ok(None) => {
                session.set_in_progress(false).await;
                session
                    .update_status(MissionStatus::Error, "Connection failed")
                    .await;
                "Failed to connect to the drone. Check the connection string and make sure the drone is powered on.".to_string()
            }
            Err(e) => {
                session.set_in_progress(false).await;
                session
                    .update_status(MissionStatus::Error, format!("Connection error: {}", e))
                    .await;
                format!("Error connecting to the drone: {}", e)
            }
        }
    }

    pub async fn takeoff(&self, session: &MissionSession, altitude: f64) -> String {
        if session.interrupt().take() {
            return "Takeoff aborted due to mission interrupt request".to_string();
        }

        session
            .update_status(
                MissionStatus::TakingOff,
                format!("Taking off to {} m", altitude),
            )
            .await;

        match self.drone.takeoff(altitude).await {
            Ok(true) => {
                session
                    .update_status(
                        MissionStatus::Airborne,
                        format!("Reached target altitude of {} m", altitude),
                    )
                    .await;
                format!("Takeoff successful! Reached target altitude of {} m.", altitude)
            }
            Ok(false) => {
                session
                    .update_status(MissionStatus::Error, "Takeoff failed")
                    .await;
                "Takeoff failed. Make sure the drone is connected and in a safe takeoff area."
                    .to_string()
            }
            Err(e) => {
                session
                    .update_status(MissionStatus::Error, format!("Takeoff error: {}", e))
                    .await;
                format!("Error during takeoff: {}", e)
            }
        }
    }

    pub async fn land(&self, session: &MissionSession) -> String {
        session
            .update_status(MissionStatus::Landing, "Drone is landing")
            .await;

        match self.drone.land().await {
            Ok(true) => {
                session
                    .update_status(MissionStatus::Landed, "Drone has landed")
                    .await;
                session.set_in_progress(false).await;
                "Land command sent successfully. The drone has landed.".to_string()
            }
            Ok(false) => {
                session
                    .update_status(MissionStatus::Error, "Landing failed")
                    .await;
                "Land command failed. Make sure the drone is connected.".to_string()
            }
            Err(e) => {
                session
                    .update_status(MissionStatus::Error, format!("Landing error: {}", e))
                    .await;
                format!("Error during landing: {}", e)
            }
        }
    }

    pub async fn return_home(&self, session: &MissionSession) -> String {
        session
            .update_status(MissionStatus::Returning, "Returning to launch point")
            .await;

        match self.drone.return_home().await {
            Ok(true) => {
                session
                    .update_status(MissionStatus::Returning, "Drone is returning home")
                    .await;
                "Return-to-home command sent. The drone is returning to its launch point."
                    .to_string()
            }
            Ok(false) => {
                session
                    .update_status(MissionStatus::Error, "Return to home failed")
                    .await;
                "Return-to-home command failed. Make sure the drone is connected.".to_string()
            }
            Err(e) => {
                session
                    .update_status(MissionStatus::Error, format!("Return to home error: {}", e))
                    .await;
                format!("Error during return to home: {}", e)
            }
        }
    }

    /// Single goto command. Does not touch the mission status.
    pub async fn fly_to(&self, lat: f64, lon: f64, alt: f64) -> String {
        match self.drone.fly_to(lat, lon, alt).await {
            Ok(true) => format!(
                "Command sent. Flying to: latitude {}, longitude {}, altitude {} m",
                lat, lon, alt
            ),
            Ok(false) => {
                "Command failed. Make sure the drone is connected and in GUIDED mode.".to_string()
            }
            Err(e) => format!("Error sending flight command: {}", e),
        }
    }

    pub async fn location(&self) -> String {
        match self.drone.get_location().await {
            Ok(location) => json!(location).to_string(),
            Err(e) => format!("Error getting drone location: {}", e),
        }
    }

    pub async fn battery(&self) -> String {
        match self.drone.get_battery().await {
            Ok(battery) => json!(battery).to_string(),
            Err(e) => format!("Error getting battery status: {}", e),
        }
    }

    /// Fly a validated mission plan, checking the interrupt token before each leg.
    ///
    /// An interrupt takes effect at the next waypoint boundary, so it can lag
    /// by at most one transit delay.
    pub async fn execute_mission(
        &self,
        session: &MissionSession,
        waypoints: &[Waypoint],
    ) -> MissionOutcome {
        let total = waypoints.len();
        session
            .update_status(
                MissionStatus::Mission,
                format!("Starting mission with {} waypoints", total),
            )
            .await;

        if session.interrupt().take() {
            session
                .update_status(MissionStatus::Aborted, "Mission interrupted before execution")
                .await;
            return MissionOutcome::Aborted;
        }

        match self.drone.execute_mission_plan(waypoints).await {
            Ok(true) => {}
            Ok(false) => {
                session
                    .update_status(MissionStatus::Error, "Mission execution failed")
                    .await;
                return MissionOutcome::Failed("make sure the drone is connected".to_string());
            }
            Err(e) => {
                session
                    .update_status(MissionStatus::Error, format!("Mission error: {}", e))
                    .await;
                return MissionOutcome::Failed(e.to_string());
            }
        }

        for (i, wp) in waypoints.iter().enumerate() {
            if session.interrupt().take() {
                return self.return_after_interrupt(session, i, total).await;
            }

            session
                .update_status(
                    MissionStatus::ExecutingMission,
                    format!(
                        "Flying to waypoint {}/{}: lat={:.4}, lon={:.4}, alt={}m",
                        i + 1,
                        total,
                        wp.lat,
                        wp.lon,
                        wp.alt
                    ),
                )
                .await;

            tokio::time::sleep(self.timing.transit_delay).await;
        }

        session
            .update_status(MissionStatus::MissionComplete, "All waypoints reached")
            .await;
        MissionOutcome::Completed { total }
    }

    async fn return_after_interrupt(
        &self,
        session: &MissionSession,
        completed: usize,
        total: usize,
    ) -> MissionOutcome {
        // The external abort path already brought the drone home and disconnected.
        if !session.in_progress().await {
            tracing::info!(
                "Mission loop stopped after {}/{} waypoints; abort already handled",
                completed,
                total
            );
            return MissionOutcome::Interrupted { completed, total };
        }

        session
            .update_status(
                MissionStatus::Interrupted,
                "Mission interrupted, returning to base",
            )
            .await;

        match self.drone.return_home().await {
            Ok(true) => {}
            Ok(false) => {
                session
                    .update_status(MissionStatus::Error, "Return to home failed after interrupt")
                    .await;
                return MissionOutcome::Failed("return to home failed after interrupt".to_string());
            }
            Err(e) => {
                session
                    .update_status(MissionStatus::Error, format!("Mission error: {}", e))
                    .await;
                return MissionOutcome::Failed(e.to_string());
            }
        }

        tokio::time::sleep(self.timing.settle_delay).await;
        session
            .update_status(
                MissionStatus::Returned,
                "Drone returned to base after interrupt",
            )
            .await;
        MissionOutcome::Interrupted { completed, total }
    }

    pub async fn disconnect(&self, session: &MissionSession) -> String {
        session
            .update_status(MissionStatus::Disconnecting, "Disconnecting from drone")
            .await;

        match self.drone.disconnect().await {
            Ok(()) => {
                session.set_in_progress(false).await;
                session
                    .update_status(MissionStatus::Standby, "Disconnected from drone")
                    .await;
                "Disconnected from the drone.".to_string()
            }
            Err(e) => {
                session
                    .update_status(MissionStatus::Error, format!("Disconnect error: {}", e))
                    .await;
                format!("Error disconnecting from the drone: {}", e)
            }
        }
    }

    /// Abort the active mission from outside the mission loop.
    ///
    /// Sets the interrupt token so a running loop stops at its next boundary,
    /// and independently brings the drone home and disconnects it.
    ///
    /// `in_progress` is cleared before the token is set, so a loop that wakes
    /// while this call is still settling leaves the drone and status alone.
    pub async fn interrupt(&self, session: &MissionSession) -> InterruptOutcome {
        if !session.in_progress().await {
            tracing::warn!("No mission in progress to interrupt");
            return InterruptOutcome::NotInProgress;
        }

        session.set_in_progress(false).await;
        session.interrupt().request();
        session
            .update_status(MissionStatus::Interrupting, "Returning to base...")
            .await;

        let result = async {
            if !self.drone.return_home().await? {
                tracing::warn!("Drone refused return-to-home during interrupt");
            }
            tokio::time::sleep(self.timing.settle_delay).await;
            self.drone.disconnect().await
        }
        .await;

        match result {
            Ok(()) => {
                session
                    .update_status(
                        MissionStatus::Aborted,
                        "Mission aborted. Drone returned to base.",
                    )
                    .await;
                InterruptOutcome::Aborted
            }
            Err(e) => {
                session
                    .update_status(MissionStatus::Error, format!("Error during interrupt: {}", e))
                    .await;
                InterruptOutcome::Failed(e.to_string())
            }
        }
    }
}
