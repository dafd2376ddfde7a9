//! # Telemetry Module
//!
//! Periodic reports of the decoded battery state.
//!
//! This module handles:
//! - Counting received and recognised frames
//! - Formatting a state snapshot as a human-readable line
//! - Formatting a state snapshot as a JSON line with a wall-clock stamp

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::bms::BatteryState;

/// Frame counters kept by the receive loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    /// All frames handed to the decoder
    pub received: u64,
    /// Frames whose identifier matched the table
    pub recognised: u64,
}

impl FrameStats {
    pub fn record(&mut self, recognised: bool) {
        self.received += 1;
        if recognised {
            self.recognised += 1;
        }
    }
}

/// One report line
#[derive(Debug, Clone, Serialize)]
pub struct StateReport {
    pub time: String,
    /// Ticks elapsed since the last frame, as seen at report time
    pub age_ms: u32,
    pub frames: FrameStats,
    pub pack_voltage: u16,
    pub pack_current: i32,
    pub temperature: u16,
    pub state_of_charge: u16,
    pub cell_count: u16,
    pub cells: Vec<u16>,
}

impl StateReport {
    /// Build a report from a state snapshot
    ///
    /// # Arguments
    ///
    /// * `state` - Snapshot to report
    /// * `stats` - Frame counters
    /// * `now_ticks` - Current tick count, for the age column
    /// * `time` - Wall-clock time of the report
    pub fn new(state: &BatteryState, stats: FrameStats, now_ticks: u32, time: DateTime<Utc>) -> Self {
        Self {
            time: time.to_rfc3339_opts(SecondsFormat::Millis, true),
            age_ms: now_ticks.saturating_sub(state.last_update_timestamp()),
            frames: stats,
            pack_voltage: state.pack_voltage(),
            pack_current: state.pack_current(),
            temperature: state.temperature(),
            state_of_charge: state.state_of_charge(),
            cell_count: state.cell_count(),
            cells: state.cell_voltages().to_vec(),
        }
    }

    /// Single-line human-readable form
    pub fn to_text(&self) -> String {
        let cells = self
            .cells
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "pack {} / {} | temp {} | soc {} | cells({}) [{}] | frames {}/{} | age {}ms",
            self.pack_voltage,
            self.pack_current,
            self.temperature,
            self.state_of_charge,
            self.cell_count,
            cells,
            self.frames.recognised,
            self.frames.received,
            self.age_ms,
        )
    }

    /// JSON Lines form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
