//! Zenoh device daemon for Raspberry Pi boards.
//!
//! Publishes the board's CPU temperature, available memory and uptime as a
//! `com.victronenergy.temperature` device object, refreshed once per second.
//!
//! # Key Expressions
//!
//! ```text
//! com/victronenergy/temperature/pi/Temperature
//! com/victronenergy/temperature/pi/History/MinimumTemperature
//! com/victronenergy/temperature/pi/History/MaximumTemperature
//! com/victronenergy/temperature/pi/System/MemoryFree
//! com/victronenergy/temperature/pi/System/Uptime
//! com/victronenergy/temperature/pi/CustomName
//! com/victronenergy/temperature/pi/@/alive
//! ```

pub mod config;
pub mod sampler;
pub mod source;
