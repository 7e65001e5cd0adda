//! # geowatch-server
//!
//! HTTP server library for the geowatch geofence monitoring service.
//!
//! This library provides the API handlers, the status board that receives
//! scheduler notifications, and the wiring that builds a running scheduler
//! from configuration.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
pub mod status;
