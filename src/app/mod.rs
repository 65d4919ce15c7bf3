//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the console's business rules: the key map, desk
//! motion orchestration, the per-tick order of sampling and safety checks,
//! and the Hue/volume bookkeeping.  All interaction with the outside world
//! happens through **port traits** defined in [`ports`], keeping this layer
//! fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
