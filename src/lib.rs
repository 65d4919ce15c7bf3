//! Desk console firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod desk;
pub mod error;
pub mod events;
pub mod input;
pub mod pins;
pub mod ui;

// The ESP-IDF-only parts of these are guarded by cfg attributes inside;
// on the host they build as simulation stubs.
pub mod adapters;
pub mod drivers;
pub mod esp_link_shims;

// Unit tests touch the embassy-sync statics; pull in the std
// critical-section implementation for them.
#[cfg(test)]
use critical_section as _;
