//! HTTP API for DeepDrone.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/chat` - Send a message to the assistant
//! - `GET /api/chat/history` - Conversation so far
//! - `GET /api/mission` - Mission status, phase and log
//! - `POST /api/mission/interrupt` - Abort the active mission and return to base

mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
