//! # Battery State Store
//!
//! Latest known value of every field the BMS broadcasts, plus the tick of the
//! most recent frame. Fields are written independently as their frames arrive,
//! so a reader may see values from different broadcast cycles.

use serde::Serialize;

use super::protocol::{Field, BMS_MAX_CELLS};

/// Snapshot of battery pack state
///
/// All values are raw bus units; nothing is scaled locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatteryState {
    /// Cell voltages, index `i` is physical cell `i + 1`
    cell_voltage: [u16; BMS_MAX_CELLS],

    /// Number of populated cells, may be less than 18
    cell_count: u16,

    /// Raw temperature reading
    temperature: u16,

    /// Raw state of charge reading
    state_of_charge: u16,

    /// Total pack voltage as reported by the unit
    pack_voltage: u16,

    /// Pack current, sign convention of the unit
    pack_current: i32,

    /// Tick count of the most recently received frame
    last_update_timestamp: u32,
}

impl BatteryState {
    /// Create a zeroed state
    pub fn new() -> Self {
        Self::default()
    }

    /// Voltage of cell `index` (0-17), or 0 when out of range
    pub fn cell_voltage(&self, index: usize) -> u16 {
        self.cell_voltage.get(index).copied().unwrap_or(0)
    }

    /// Voltages of the populated cells only
    ///
    /// Clamped to 18 entries if the unit reports a larger count.
    pub fn cell_voltages(&self) -> &[u16] {
        let count = usize::from(self.cell_count).min(BMS_MAX_CELLS);
        &self.cell_voltage[..count]
    }

    pub fn cell_count(&self) -> u16 {
        self.cell_count
    }

    pub fn temperature(&self) -> u16 {
        self.temperature
    }

    pub fn state_of_charge(&self) -> u16 {
        self.state_of_charge
    }

    pub fn pack_voltage(&self) -> u16 {
        self.pack_voltage
    }

    pub fn pack_current(&self) -> i32 {
        self.pack_current
    }

    /// Tick of the last frame seen, recognised or not
    pub fn last_update_timestamp(&self) -> u32 {
        self.last_update_timestamp
    }

    /// Copy of the whole record
    pub fn snapshot(&self) -> BatteryState {
        *self
    }

    pub(crate) fn touch(&mut self, tick: u32) {
        self.last_update_timestamp = tick;
    }

    /// Store an extracted word
    ///
    /// Unsigned fields keep the low 16 bits, which is lossless for words
    /// produced by an unsigned rule.
    pub(crate) fn write(&mut self, field: Field, value: i32) {
        match field {
            Field::PackVoltage => self.pack_voltage = value as u16,
            Field::PackCurrent => self.pack_current = value,
            Field::Temperature => self.temperature = value as u16,
            Field::StateOfCharge => self.state_of_charge = value as u16,
            Field::CellCount => self.cell_count = value as u16,
            Field::CellVoltage(index) => {
                if let Some(slot) = self.cell_voltage.get_mut(index) {
                    *slot = value as u16;
                }
            }
        }
    }
}
