//! Tollgate - Multi-Window Rate Limiting
//!
//! This crate implements per-principal admission control over three fixed
//! windows (minute, hour and day). Budgets come from the principal's tier,
//! state lives in process memory, and a background janitor evicts
//! principals that have gone idle.

pub mod config;
pub mod error;
pub mod ratelimit;
