//! # CAN Reception Module
//!
//! Frame type and the SLCAN codec used to receive frames from a serial CAN
//! adapter.
//!
//! This module handles:
//! - Classic CAN frames via the `embedded_can::Frame` trait
//! - SLCAN record decoding (standard, extended, remote, timestamped)
//! - Splitting an adapter byte stream into records

pub mod frame;
pub mod slcan;

pub use frame::CanFrame;
pub use slcan::SlcanReader;
