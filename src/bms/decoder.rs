//! # BMS Frame Dispatcher
//!
//! Routes received frames by identifier to the extraction rules of their
//! message kind and writes the results into a [`BatteryState`].

use embedded_can::{Frame, Id};
use tracing::trace;

use super::protocol::{FrameIds, Payload, BMS_PAYLOAD_SIZE};
use super::state::BatteryState;

/// Frame dispatcher for one BMS
///
/// Holds only the identifier table; the state it updates is owned by the
/// caller and passed in by `&mut`, so there is exactly one writer.
#[derive(Debug, Clone, Default)]
pub struct BmsDecoder {
    ids: FrameIds,
}

impl BmsDecoder {
    /// Create a dispatcher for the given identifier table
    pub fn new(ids: FrameIds) -> Self {
        Self { ids }
    }

    /// Identifier table in use
    pub fn ids(&self) -> &FrameIds {
        &self.ids
    }

    /// Apply one received frame
    ///
    /// # Arguments
    ///
    /// * `state` - Battery state to update
    /// * `id` - Raw 29-bit or 11-bit frame identifier
    /// * `payload` - The 8 payload bytes
    /// * `tick` - Current tick count from the reception layer
    ///
    /// The timestamp is refreshed for every frame, known or not. Unknown
    /// identifiers leave every other field untouched.
    ///
    /// # Returns
    ///
    /// * `bool` - Whether the identifier was recognised
    pub fn update(&self, state: &mut BatteryState, id: u32, payload: &Payload, tick: u32) -> bool {
        state.touch(tick);

        let Some(message) = self.ids.lookup(id) else {
            trace!("Ignoring frame 0x{:08X}", id);
            return false;
        };

        for rule in message.rules() {
            state.write(rule.field, rule.extract(payload));
        }

        trace!("Applied {:?} frame 0x{:08X}", message, id);
        true
    }

    /// Apply any `embedded_can` frame
    ///
    /// Frames with fewer than 8 data bytes are zero-padded. Remote frames
    /// carry no payload and only refresh the timestamp.
    pub fn apply_frame<F: Frame>(&self, state: &mut BatteryState, frame: &F, tick: u32) -> bool {
        if frame.is_remote_frame() {
            state.touch(tick);
            return false;
        }

        let id = raw_id(frame.id());
        let data = frame.data();
        let len = data.len().min(BMS_PAYLOAD_SIZE);

        let mut payload = [0u8; BMS_PAYLOAD_SIZE];
        payload[..len].copy_from_slice(&data[..len]);

        self.update(state, id, &payload, tick)
    }
}

/// Raw numeric value of a standard or extended identifier
pub fn raw_id(id: Id) -> u32 {
    match id {
        Id::Standard(standard) => u32::from(standard.as_raw()),
        Id::Extended(extended) => extended.as_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bms::protocol::*;
    use crate::can::CanFrame;
    use embedded_can::{ExtendedId, StandardId};

    fn decode(id: u32, payload: Payload, tick: u32) -> BatteryState {
        let mut state = BatteryState::new();
        BmsDecoder::default().update(&mut state, id, &payload, tick);
        state
    }

    #[test]
    fn test_pack_summary_positive_current() {
        let state = decode(BMS_ID_PACK_SUMMARY, [0, 0, 0x10, 0x27, 0, 0x05, 0xFB, 0], 10);
        assert_eq!(state.pack_voltage(), 10000);
        assert_eq!(state.pack_current(), 1531);
        assert_eq!(state.last_update_timestamp(), 10);
    }

    #[test]
    fn test_pack_summary_negative_current() {
        let state = decode(BMS_ID_PACK_SUMMARY, [0, 0, 0, 0, 0, 0xFF, 0x00, 0], 1);
        assert_eq!(state.pack_current(), -256);
    }

    #[test]
    fn test_pack_summary_minimum_current() {
        let state = decode(BMS_ID_PACK_SUMMARY, [0, 0, 0, 0, 0, 0x80, 0x00, 0], 1);
        assert_eq!(state.pack_current(), -32768);
    }

    #[test]
    fn test_pack_summary_ignores_unused_bytes() {
        let state = decode(BMS_ID_PACK_SUMMARY, [0xAA, 0xBB, 0x10, 0x27, 0xCC, 0, 0x01, 0xDD], 1);
        assert_eq!(state.pack_voltage(), 10000);
        assert_eq!(state.pack_current(), 1);
    }

    #[test]
    fn test_temp_soc() {
        let state = decode(BMS_ID_TEMP_SOC, [0x00, 0x01, 0, 0, 0x64, 0, 0, 0], 1);
        assert_eq!(state.temperature(), 256);
        assert_eq!(state.state_of_charge(), 100);
        assert_eq!(state.pack_voltage(), 0);
    }

    #[test]
    fn test_cellgroup_1_2() {
        let state = decode(BMS_ID_CELLGROUP_1_2, [0, 0, 0x10, 0x00, 0xE4, 0x0C, 0xE5, 0x0C], 1);
        assert_eq!(state.cell_count(), 16);
        assert_eq!(state.cell_voltage(0), 0x0CE4);
        assert_eq!(state.cell_voltage(1), 0x0CE5);
        assert_eq!(state.cell_voltage(2), 0);
    }

    #[test]
    fn test_cellgroup_3_6() {
        let state = decode(BMS_ID_CELLGROUP_3_6, [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00], 1);
        assert_eq!(state.cell_voltage(1), 0);
        assert_eq!(state.cell_voltage(2), 1);
        assert_eq!(state.cell_voltage(3), 2);
        assert_eq!(state.cell_voltage(4), 3);
        assert_eq!(state.cell_voltage(5), 4);
        assert_eq!(state.cell_voltage(6), 0);
    }

    #[test]
    fn test_remaining_cell_groups() {
        let payload = [0x01, 0x0D, 0x02, 0x0D, 0x03, 0x0D, 0x04, 0x0D];
        for (id, base) in [
            (BMS_ID_CELLGROUP_7_10, 6),
            (BMS_ID_CELLGROUP_11_14, 10),
            (BMS_ID_CELLGROUP_15_18, 14),
        ] {
            let state = decode(id, payload, 1);
            assert_eq!(state.cell_voltage(base - 1), 0, "cell below group 0x{:08X}", id);
            assert_eq!(state.cell_voltage(base), 0x0D01);
            assert_eq!(state.cell_voltage(base + 1), 0x0D02);
            assert_eq!(state.cell_voltage(base + 2), 0x0D03);
            assert_eq!(state.cell_voltage(base + 3), 0x0D04);
            assert_eq!(state.cell_voltage(base + 4), 0, "cell above group 0x{:08X}", id);
        }
    }

    #[test]
    fn test_unknown_id_only_touches_timestamp() {
        let decoder = BmsDecoder::default();
        let mut state = BatteryState::new();
        decoder.update(&mut state, BMS_ID_PACK_SUMMARY, &[0, 0, 0x10, 0x27, 0, 0x05, 0xFB, 0], 5);
        decoder.update(&mut state, BMS_ID_TEMP_SOC, &[0x19, 0, 0, 0, 0x50, 0, 0, 0], 5);
        decoder.update(&mut state, BMS_ID_CELLGROUP_1_2, &[0, 0, 4, 0, 1, 1, 2, 2], 6);
        // Cells beyond cell_count are stored but hidden from cell_voltages()
        decoder.update(&mut state, BMS_ID_CELLGROUP_15_18, &[9, 9, 8, 8, 7, 7, 6, 6], 6);
        let before = state.snapshot();

        let recognised = decoder.update(&mut state, 0x123, &[0xFF; 8], 7);

        assert!(!recognised);
        let mut expected = before;
        expected.touch(7);
        assert_eq!(state, expected);
        assert_eq!(state.cell_voltage(17), 0x0606);
    }

    #[test]
    fn test_unknown_then_temp_soc() {
        let decoder = BmsDecoder::default();
        let mut state = BatteryState::new();

        decoder.update(&mut state, 0x7FF, &[0; 8], 100);
        assert_eq!(state.last_update_timestamp(), 100);

        decoder.update(&mut state, BMS_ID_TEMP_SOC, &[0x00, 0x01, 0, 0, 0x64, 0, 0, 0], 150);
        assert_eq!(state.temperature(), 256);
        assert_eq!(state.state_of_charge(), 100);
        assert_eq!(state.last_update_timestamp(), 150);
    }

    #[test]
    fn test_same_frame_twice_is_idempotent() {
        let decoder = BmsDecoder::default();
        let payload = [0x10, 0x0D, 0x11, 0x0D, 0x12, 0x0D, 0x13, 0x0D];

        let mut once = BatteryState::new();
        decoder.update(&mut once, BMS_ID_CELLGROUP_7_10, &payload, 9);

        let mut twice = BatteryState::new();
        decoder.update(&mut twice, BMS_ID_CELLGROUP_7_10, &payload, 9);
        decoder.update(&mut twice, BMS_ID_CELLGROUP_7_10, &payload, 9);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_later_frame_overwrites_fields() {
        let decoder = BmsDecoder::default();
        let mut state = BatteryState::new();
        decoder.update(&mut state, BMS_ID_TEMP_SOC, &[25, 0, 0, 0, 80, 0, 0, 0], 1);
        decoder.update(&mut state, BMS_ID_TEMP_SOC, &[26, 0, 0, 0, 79, 0, 0, 0], 2);
        assert_eq!(state.temperature(), 26);
        assert_eq!(state.state_of_charge(), 79);
    }

    #[test]
    fn test_custom_identifier_table() {
        let ids = FrameIds {
            temp_soc: 0x300,
            ..FrameIds::default()
        };
        let decoder = BmsDecoder::new(ids);
        let mut state = BatteryState::new();

        assert!(!decoder.update(&mut state, BMS_ID_TEMP_SOC, &[1, 0, 0, 0, 2, 0, 0, 0], 1));
        assert_eq!(state.temperature(), 0);

        assert!(decoder.update(&mut state, 0x300, &[1, 0, 0, 0, 2, 0, 0, 0], 2));
        assert_eq!(state.temperature(), 1);
        assert_eq!(state.state_of_charge(), 2);
    }

    #[test]
    fn test_apply_extended_frame() {
        let decoder = BmsDecoder::default();
        let mut state = BatteryState::new();
        let id = ExtendedId::new(BMS_ID_PACK_SUMMARY).unwrap();
        let frame = CanFrame::new(id, &[0, 0, 0x10, 0x27, 0, 0xFF, 0x00, 0]).unwrap();

        assert!(decoder.apply_frame(&mut state, &frame, 3));
        assert_eq!(state.pack_voltage(), 10000);
        assert_eq!(state.pack_current(), -256);
    }

    #[test]
    fn test_apply_short_frame_is_zero_padded() {
        let decoder = BmsDecoder::default();
        let mut state = BatteryState::new();
        let id = ExtendedId::new(BMS_ID_CELLGROUP_1_2).unwrap();
        let frame = CanFrame::new(id, &[0, 0, 0x08, 0x00, 0x10]).unwrap();

        assert!(decoder.apply_frame(&mut state, &frame, 3));
        assert_eq!(state.cell_count(), 8);
        assert_eq!(state.cell_voltage(0), 0x0010);
        assert_eq!(state.cell_voltage(1), 0);
    }

    #[test]
    fn test_apply_remote_frame_only_touches_timestamp() {
        let decoder = BmsDecoder::default();
        let mut state = BatteryState::new();
        let id = ExtendedId::new(BMS_ID_TEMP_SOC).unwrap();
        let frame = CanFrame::new_remote(id, 8).unwrap();

        assert!(!decoder.apply_frame(&mut state, &frame, 12));
        assert_eq!(state.last_update_timestamp(), 12);
        assert_eq!(state.temperature(), 0);
    }

    #[test]
    fn test_raw_id() {
        let standard = StandardId::new(0x7E0).unwrap();
        assert_eq!(raw_id(Id::Standard(standard)), 0x7E0);
        let extended = ExtendedId::new(0x1FFF_FFFF).unwrap();
        assert_eq!(raw_id(Id::Extended(extended)), 0x1FFF_FFFF);
    }
}
