//! Per-session mission context: state plus the interrupt token.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::state::{MissionState, MissionStatus, StatusTone};

/// Cooperative cancellation signal for a running mission.
///
/// The waypoint loop polls it before each leg; that is the only point where
/// a running mission can be preempted.
#[derive(Debug, Clone, Default)]
pub struct InterruptToken(Arc<AtomicBool>);

impl InterruptToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running mission to stop at its next waypoint boundary.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consume a pending request. Returns whether one was pending.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Read-only view of the session for front ends.
#[derive(Debug, Clone, Serialize)]
pub struct MissionSnapshot {
    pub status: MissionStatus,
    pub tone: StatusTone,
    pub phase: String,
    pub in_progress: bool,
    pub interrupt_requested: bool,
    pub log: Vec<String>,
}

/// Mission context owned by the caller and passed into every mission operation.
#[derive(Debug, Clone, Default)]
pub struct MissionSession {
    state: Arc<RwLock<MissionState>>,
    interrupt: InterruptToken,
}

impl MissionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The single mutation point for status and phase.
    pub async fn update_status(&self, status: MissionStatus, phase: impl Into<String>) {
        let entry = self.state.write().await.update_status(status, phase);
        if status == MissionStatus::Error {
            tracing::warn!("{}", entry);
        } else {
            tracing::info!("{}", entry);
        }
    }

    pub async fn set_in_progress(&self, in_progress: bool) {
        self.state.write().await.in_progress = in_progress;
    }

    pub async fn in_progress(&self) -> bool {
        self.state.read().await.in_progress
    }

    pub async fn status(&self) -> MissionStatus {
        self.state.read().await.status
    }

    /// Log entries recorded after the first `seen` transitions, oldest first,
    /// together with the current transition count.
    ///
    /// Entries that already fell out of the log ring are not returned.
    pub async fn log_since(&self, seen: u64) -> (Vec<String>, u64) {
        let state = self.state.read().await;
        let fresh = state.updates.saturating_sub(seen).min(state.log.len() as u64) as usize;
        let entries = state.log.iter().skip(state.log.len() - fresh).cloned().collect();
        (entries, state.updates)
    }

    pub fn interrupt(&self) -> &InterruptToken {
        &self.interrupt
    }

    pub async fn snapshot(&self) -> MissionSnapshot {
        let state = self.state.read().await;
        MissionSnapshot {
            status: state.status,
            tone: state.status.tone(),
            phase: state.phase.clone(),
            in_progress: state.in_progress,
            interrupt_requested: self.interrupt.is_requested(),
            log: state.log.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_token_take_clears() {
        let token = InterruptToken::new();
        assert!(!token.take());
        token.request();
        assert!(token.is_requested());
        assert!(token.take());
        assert!(!token.is_requested());
        assert!(!token.take());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let session = MissionSession::new();
        let ui_view = session.clone();

        session.set_in_progress(true).await;
        session
            .update_status(MissionStatus::Connecting, "Connecting to drone at udp:127.0.0.1:14550")
            .await;
        ui_view.interrupt().request();

        let snapshot = ui_view.snapshot().await;
        assert_eq!(snapshot.status, MissionStatus::Connecting);
        assert!(snapshot.in_progress);
        assert!(snapshot.interrupt_requested);
        assert_eq!(snapshot.log.len(), 1);
        assert!(session.interrupt().take());
    }

    #[tokio::test]
    async fn test_log_since_returns_new_entries() {
        let session = MissionSession::new();
        session.update_status(MissionStatus::Connecting, "first").await;
        let (first, seen) = session.log_since(0).await;
        assert_eq!(first.len(), 1);
        assert_eq!(seen, 1);
        assert_eq!(session.log_since(seen).await, (Vec::new(), 1));

        session.update_status(MissionStatus::Connected, "second").await;
        session.update_status(MissionStatus::TakingOff, "third").await;
        let (fresh, count) = session.log_since(seen).await;
        assert_eq!(count, 3);
        assert_eq!(fresh.len(), 2);
        assert!(fresh[0].ends_with("CONNECTED: second"));
        assert!(fresh[1].ends_with("TAKING OFF: third"));

        for i in 0..40 {
            session
                .update_status(MissionStatus::ExecutingMission, format!("leg {}", i))
                .await;
        }
        let (all, _) = session.log_since(0).await;
        assert_eq!(all.len(), crate::mission::MISSION_LOG_CAPACITY);
    }
}
