//! HTTP front end for the playoff bracket engine.
//!
//! - [`api`]: axum router and JSON handlers
//! - [`config`]: environment-driven server configuration
//! - [`logging`]: tracing setup and structured bracket event helpers
//! - [`metrics`]: Prometheus counters for requests and bracket events

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
