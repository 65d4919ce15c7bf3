//! Closed-loop actuator control.

pub mod fan;
