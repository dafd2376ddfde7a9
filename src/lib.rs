//! # BMS CAN Monitor Library
//!
//! Decode the periodic CAN broadcasts of a battery monitoring unit into a
//! live battery pack state.
//!
//! The core is [`bms::BmsDecoder`], which applies one frame at a time to an
//! owned [`bms::BatteryState`]. Frame reception ([`can`], [`serial`]), tick
//! counting ([`clock`]) and reporting ([`telemetry`]) surround it.
//!
//! # Example
//!
//! ```
//! use bms_can_monitor::bms::{BatteryState, BmsDecoder};
//! use bms_can_monitor::bms::protocol::BMS_ID_PACK_SUMMARY;
//!
//! let decoder = BmsDecoder::default();
//! let mut state = BatteryState::new();
//!
//! decoder.update(&mut state, BMS_ID_PACK_SUMMARY, &[0, 0, 0x10, 0x27, 0, 0x05, 0xFB, 0], 42);
//! assert_eq!(state.pack_voltage(), 10000);
//! assert_eq!(state.pack_current(), 1531);
//! assert_eq!(state.last_update_timestamp(), 42);
//! ```

pub mod config;
pub mod error;
pub mod bms;
pub mod can;
pub mod clock;
pub mod monitor;
pub mod serial;
pub mod telemetry;
