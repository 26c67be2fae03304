//! Flagdeck · Course CTF Backend
//!
//! Library surface: challenge catalog, answer verification, sandboxed code
//! execution with a wall-clock deadline, per-class progress tracking, the
//! password session gate, and the Axum HTTP/WebSocket routes.

pub mod telemetry;
pub mod util;
pub mod domain;
pub mod verify;
pub mod catalog;
pub mod config;
pub mod sandbox;
pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod state;
pub mod protocol;
pub mod logic;
pub mod routes;
