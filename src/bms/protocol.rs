//! # BMS Broadcast Protocol
//!
//! Identifiers and field layouts of the seven periodic frames the battery
//! monitoring unit broadcasts. Every field is a 16-bit word assembled as
//! `payload[high] << 8 | payload[low]`.

use serde::{Deserialize, Serialize};

/// Payload length of every BMS broadcast frame
pub const BMS_PAYLOAD_SIZE: usize = 8;

/// Number of cell voltage slots reported by the unit
pub const BMS_MAX_CELLS: usize = 18;

/// Total pack voltage and current
pub const BMS_ID_PACK_SUMMARY: u32 = 0x002E_0951;

/// Temperature and state of charge
pub const BMS_ID_TEMP_SOC: u32 = 0x002E_0942;

/// Cell count plus cells 1-2
pub const BMS_ID_CELLGROUP_1_2: u32 = 0x002E_0943;

/// Cells 3-6
pub const BMS_ID_CELLGROUP_3_6: u32 = 0x002E_0944;

/// Cells 7-10
pub const BMS_ID_CELLGROUP_7_10: u32 = 0x002E_0945;

/// Cells 11-14
pub const BMS_ID_CELLGROUP_11_14: u32 = 0x002E_0946;

/// Cells 15-18
pub const BMS_ID_CELLGROUP_15_18: u32 = 0x002E_094F;

/// Fixed 8-byte frame payload
pub type Payload = [u8; BMS_PAYLOAD_SIZE];

/// The seven message kinds the unit broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BmsMessage {
    PackSummary,
    TempSoc,
    CellGroup1To2,
    CellGroup3To6,
    CellGroup7To10,
    CellGroup11To14,
    CellGroup15To18,
}

impl BmsMessage {
    /// All message kinds, in identifier table order
    pub const ALL: [BmsMessage; 7] = [
        BmsMessage::PackSummary,
        BmsMessage::TempSoc,
        BmsMessage::CellGroup1To2,
        BmsMessage::CellGroup3To6,
        BmsMessage::CellGroup7To10,
        BmsMessage::CellGroup11To14,
        BmsMessage::CellGroup15To18,
    ];

    /// Extraction rules for this message kind
    pub fn rules(self) -> &'static [FieldRule] {
        match self {
            BmsMessage::PackSummary => PACK_SUMMARY_RULES,
            BmsMessage::TempSoc => TEMP_SOC_RULES,
            BmsMessage::CellGroup1To2 => CELLGROUP_1_2_RULES,
            BmsMessage::CellGroup3To6 => CELLGROUP_3_6_RULES,
            BmsMessage::CellGroup7To10 => CELLGROUP_7_10_RULES,
            BmsMessage::CellGroup11To14 => CELLGROUP_11_14_RULES,
            BmsMessage::CellGroup15To18 => CELLGROUP_15_18_RULES,
        }
    }
}

/// Destination field of one extracted word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    PackVoltage,
    PackCurrent,
    Temperature,
    StateOfCharge,
    CellCount,
    /// Zero-based cell index (0-17)
    CellVoltage(usize),
}

/// How the assembled 16-bit word is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Unsigned,
    /// Two's complement, sign-extended when widened
    Signed,
}

/// One field descriptor: where the word lives and how to read it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: Field,
    /// Offset of the byte shifted into the upper half
    pub high: usize,
    /// Offset of the byte forming the lower half
    pub low: usize,
    pub encoding: Encoding,
}

impl FieldRule {
    /// Little-endian unsigned word at `offset`, `offset + 1`
    pub const fn le_u16(field: Field, offset: usize) -> Self {
        Self {
            field,
            high: offset + 1,
            low: offset,
            encoding: Encoding::Unsigned,
        }
    }

    /// Extract the word from `payload`, widened to `i32`
    ///
    /// Unsigned words widen to `0..=65535`, signed words are sign-extended.
    pub fn extract(&self, payload: &Payload) -> i32 {
        let raw = u16::from(payload[self.high]) << 8 | u16::from(payload[self.low]);
        match self.encoding {
            Encoding::Unsigned => i32::from(raw),
            Encoding::Signed => i32::from(raw as i16),
        }
    }
}

const PACK_SUMMARY_RULES: &[FieldRule] = &[
    FieldRule::le_u16(Field::PackVoltage, 2),
    // The only big-endian word on this bus: high byte comes first.
    FieldRule {
        field: Field::PackCurrent,
        high: 5,
        low: 6,
        encoding: Encoding::Signed,
    },
];

const TEMP_SOC_RULES: &[FieldRule] = &[
    FieldRule::le_u16(Field::Temperature, 0),
    FieldRule::le_u16(Field::StateOfCharge, 4),
];

const CELLGROUP_1_2_RULES: &[FieldRule] = &[
    FieldRule::le_u16(Field::CellCount, 2),
    FieldRule::le_u16(Field::CellVoltage(0), 4),
    FieldRule::le_u16(Field::CellVoltage(1), 6),
];

const CELLGROUP_3_6_RULES: &[FieldRule] = &cell_group(2);
const CELLGROUP_7_10_RULES: &[FieldRule] = &cell_group(6);
const CELLGROUP_11_14_RULES: &[FieldRule] = &cell_group(10);
const CELLGROUP_15_18_RULES: &[FieldRule] = &cell_group(14);

/// Four consecutive little-endian cell words starting at cell `base`
const fn cell_group(base: usize) -> [FieldRule; 4] {
    [
        FieldRule::le_u16(Field::CellVoltage(base), 0),
        FieldRule::le_u16(Field::CellVoltage(base + 1), 2),
        FieldRule::le_u16(Field::CellVoltage(base + 2), 4),
        FieldRule::le_u16(Field::CellVoltage(base + 3), 6),
    ]
}

/// Identifier table mapping wire identifiers to message kinds
///
/// Defaults are the values the battery unit puts on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameIds {
    pub pack_summary: u32,
    pub temp_soc: u32,
    pub cellgroup_1_2: u32,
    pub cellgroup_3_6: u32,
    pub cellgroup_7_10: u32,
    pub cellgroup_11_14: u32,
    pub cellgroup_15_18: u32,
}

impl Default for FrameIds {
    fn default() -> Self {
        Self {
            pack_summary: BMS_ID_PACK_SUMMARY,
            temp_soc: BMS_ID_TEMP_SOC,
            cellgroup_1_2: BMS_ID_CELLGROUP_1_2,
            cellgroup_3_6: BMS_ID_CELLGROUP_3_6,
            cellgroup_7_10: BMS_ID_CELLGROUP_7_10,
            cellgroup_11_14: BMS_ID_CELLGROUP_11_14,
            cellgroup_15_18: BMS_ID_CELLGROUP_15_18,
        }
    }
}

impl FrameIds {
    /// Identifier configured for `message`
    pub fn id_of(&self, message: BmsMessage) -> u32 {
        match message {
            BmsMessage::PackSummary => self.pack_summary,
            BmsMessage::TempSoc => self.temp_soc,
            BmsMessage::CellGroup1To2 => self.cellgroup_1_2,
            BmsMessage::CellGroup3To6 => self.cellgroup_3_6,
            BmsMessage::CellGroup7To10 => self.cellgroup_7_10,
            BmsMessage::CellGroup11To14 => self.cellgroup_11_14,
            BmsMessage::CellGroup15To18 => self.cellgroup_15_18,
        }
    }

    /// Message kind carried by `id`, if any
    pub fn lookup(&self, id: u32) -> Option<BmsMessage> {
        BmsMessage::ALL.into_iter().find(|&m| self.id_of(m) == id)
    }

    /// True when no two message kinds share an identifier
    pub fn is_distinct(&self) -> bool {
        let ids = BmsMessage::ALL.map(|m| self.id_of(m));
        ids.iter()
            .enumerate()
            .all(|(i, id)| !ids[i + 1..].contains(id))
    }
}
