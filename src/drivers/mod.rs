//! Actuator and sensor drivers, hardware initialisation, and peripheral helpers.

pub mod board;
pub mod hw_init;
pub mod oled;
pub mod relay;
pub mod task_pin;
pub mod ultrasonic;
pub mod usb_hid;
pub mod watchdog;
