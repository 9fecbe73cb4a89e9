//! Mission status values and the bounded status log.

use serde::{Serialize, Serializer};
use std::collections::VecDeque;

/// Number of log entries kept; older entries are trimmed on append.
pub const MISSION_LOG_CAPACITY: usize = 30;

/// Status shown for the current mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissionStatus {
    Standby,
    Connecting,
    Connected,
    TakingOff,
    Airborne,
    Mission,
    ExecutingMission,
    MissionComplete,
    Returning,
    Landing,
    Landed,
    Interrupting,
    Aborted,
    Interrupted,
    Returned,
    Disconnecting,
    Error,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standby => "STANDBY",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::TakingOff => "TAKING OFF",
            Self::Airborne => "AIRBORNE",
            Self::Mission => "MISSION",
            Self::ExecutingMission => "EXECUTING MISSION",
            Self::MissionComplete => "MISSION COMPLETE",
            Self::Returning => "RETURNING",
            Self::Landing => "LANDING",
            Self::Landed => "LANDED",
            Self::Interrupting => "INTERRUPTING",
            Self::Aborted => "ABORTED",
            Self::Interrupted => "INTERRUPTED",
            Self::Returned => "RETURNED",
            Self::Disconnecting => "DISCONNECTING",
            Self::Error => "ERROR",
        }
    }

    /// How a front end should style a log line for this status.
    pub fn tone(&self) -> StatusTone {
        match self {
            Self::Error => StatusTone::Error,
            Self::Connecting | Self::TakingOff | Self::Landing | Self::Returning => {
                StatusTone::Transition
            }
            Self::Mission | Self::ExecutingMission | Self::Airborne => StatusTone::Active,
            Self::MissionComplete | Self::Connected => StatusTone::Success,
            _ => StatusTone::Info,
        }
    }
}

impl std::fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MissionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Display grouping for statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Error,
    Transition,
    Active,
    Success,
    Info,
}

/// Mission bookkeeping owned by one session.
#[derive(Debug, Clone, Serialize)]
pub struct MissionState {
    pub in_progress: bool,
    pub status: MissionStatus,
    pub phase: String,
    pub log: VecDeque<String>,
    /// Total transitions recorded, including ones already dropped from `log`.
    pub updates: u64,
}

impl Default for MissionState {
    fn default() -> Self {
        Self {
            in_progress: false,
            status: MissionStatus::Standby,
            phase: String::new(),
            log: VecDeque::with_capacity(MISSION_LOG_CAPACITY),
            updates: 0,
        }
    }
}

impl MissionState {
    /// Record a transition: append a timestamped log line and overwrite status and phase.
    ///
    /// Returns the log line.
    pub fn update_status(&mut self, status: MissionStatus, phase: impl Into<String>) -> String {
        let phase = phase.into();
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let entry = format!("[{}] {}: {}", timestamp, status, phase);

        self.log.push_back(entry.clone());
        while self.log.len() > MISSION_LOG_CAPACITY {
            self.log.pop_front();
        }

        self.updates += 1;
        self.status = status;
        self.phase = phase;
        entry
    }
}
