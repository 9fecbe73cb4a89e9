//! # DeepDrone
//!
//! Chat front end that lets a language model fly drone missions.
//!
//! This library provides:
//! - A chat-completion adapter that turns provider answers into plain text
//!   or a `final_answer`-terminated tool script
//! - A mission controller with an interruptible multi-waypoint loop
//! - Drone and flight-data analysis tools for the tool-calling model
//! - An HTTP API for chatting, watching mission status and aborting missions
//!
//! ## Architecture
//!
//! ```text
//!   POST /api/chat ──▶ DroneAssistant ──▶ ChatModel (GLM / DeepSeek)
//!                            │
//!                            ▼
//!                       ToolRegistry ──▶ MissionController ──▶ DroneLink
//!                                               │
//!   POST /api/mission/interrupt ────────────────┘ (InterruptToken)
//! ```
//!
//! ## Modules
//! - `llm`: provider client, message cleaning, tool-call scripts
//! - `mission`: mission state, session, waypoints and the controller
//! - `drone`: drone collaborator trait and simulator
//! - `tools`: tools exposed to the model
//! - `assistant`: message routing and history
//! - `telemetry`: flight logs and sensor statistics
//! - `api`: HTTP server

pub mod api;
pub mod assistant;
pub mod config;
pub mod drone;
pub mod llm;
pub mod mission;
pub mod telemetry;
pub mod tools;

pub use config::Config;
