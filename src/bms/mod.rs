//! # BMS Module
//!
//! Decoding of the battery monitoring unit's CAN broadcasts.
//!
//! This module handles:
//! - Identifier table for the seven broadcast frames
//! - Table-driven field extraction (16-bit words, one big-endian exception)
//! - The battery state record and its accessors

pub mod protocol;
pub mod decoder;
pub mod state;

pub use decoder::BmsDecoder;
pub use protocol::FrameIds;
pub use state::BatteryState;
