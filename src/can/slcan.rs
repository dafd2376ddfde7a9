//! # SLCAN Receive Codec
//!
//! Decodes the Lawicel SLCAN ASCII records a serial CAN adapter emits for
//! every frame it sees on the bus.
//!
//! Record layout (terminated by `\r`):
//!
//! | Prefix | Meaning | Id digits |
//! |---|---|---|
//! | `t` | standard data frame | 3 |
//! | `T` | extended data frame | 8 |
//! | `r` | standard remote frame | 3 |
//! | `R` | extended remote frame | 8 |
//!
//! followed by one DLC digit, `2 × DLC` data hex digits for data frames, and
//! an optional 4-digit timestamp when the adapter has timestamps enabled.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use super::frame::{CanFrame, CAN_MAX_DLC};
use crate::error::{BmsError, Result};

/// Record terminator
pub const SLCAN_CR: u8 = b'\r';

/// Error reply from the adapter
pub const SLCAN_BELL: u8 = 0x07;

const STANDARD_ID_DIGITS: usize = 3;
const EXTENDED_ID_DIGITS: usize = 8;
const TIMESTAMP_DIGITS: usize = 4;

/// Longest record: `T` + 8 id + 1 dlc + 16 data + 4 timestamp
pub const SLCAN_MAX_RECORD: usize = 1 + EXTENDED_ID_DIGITS + 1 + 2 * CAN_MAX_DLC + TIMESTAMP_DIGITS;

/// Decode one SLCAN record (without terminator)
///
/// # Returns
///
/// * `Result<Option<CanFrame>>` - The frame, `None` for records that are not
///   frames (transmit acks, status replies), or an error if malformed
///
/// # Errors
///
/// Returns error if:
/// - A frame record is truncated
/// - Any id, DLC or data digit is not hex
/// - The DLC exceeds 8 or the id does not fit its format
pub fn decode_record(record: &[u8]) -> Result<Option<CanFrame>> {
    let Some((&kind, body)) = record.split_first() else {
        return Ok(None);
    };

    let (extended, remote) = match kind {
        b't' => (false, false),
        b'T' => (true, false),
        b'r' => (false, true),
        b'R' => (true, true),
        // `z`/`Z` transmit acks, version and status replies
        _ => return Ok(None),
    };

    let id_digits = if extended { EXTENDED_ID_DIGITS } else { STANDARD_ID_DIGITS };
    if body.len() < id_digits + 1 {
        return Err(BmsError::Slcan(format!(
            "Record too short: {:?}",
            String::from_utf8_lossy(record)
        )));
    }

    let id = parse_hex(&body[..id_digits])?;
    let dlc = parse_hex(&body[id_digits..id_digits + 1])? as usize;
    if dlc > CAN_MAX_DLC {
        return Err(BmsError::Slcan(format!("Invalid DLC: {}", dlc)));
    }

    let rest = &body[id_digits + 1..];
    let data_digits = if remote { 0 } else { 2 * dlc };
    if rest.len() != data_digits && rest.len() != data_digits + TIMESTAMP_DIGITS {
        return Err(BmsError::Slcan(format!(
            "Expected {} data digits, got {}",
            data_digits,
            rest.len()
        )));
    }

    let frame = if remote {
        CanFrame::remote_from_raw(id, extended, dlc)
    } else {
        let mut data = [0u8; CAN_MAX_DLC];
        for (i, pair) in rest[..data_digits].chunks_exact(2).enumerate() {
            data[i] = parse_hex(pair)? as u8;
        }
        CanFrame::from_raw(id, extended, &data[..dlc])
    };

    frame
        .map(Some)
        .ok_or_else(|| BmsError::Slcan(format!("Identifier out of range: 0x{:X}", id)))
}

fn parse_hex(digits: &[u8]) -> Result<u32> {
    digits.iter().try_fold(0u32, |acc, &digit| {
        let value = (digit as char)
            .to_digit(16)
            .ok_or_else(|| BmsError::Slcan(format!("Invalid hex digit: {:?}", digit as char)))?;
        Ok(acc << 4 | value)
    })
}

/// Streaming SLCAN reader over any async byte source
///
/// Splits the stream on `\r` (tolerating `\n`), skips adapter replies and
/// malformed records, and yields decoded frames.
#[derive(Debug)]
pub struct SlcanReader<R> {
    inner: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> SlcanReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(256),
        }
    }

    /// Read until the next complete frame
    ///
    /// # Returns
    ///
    /// * `Result<Option<CanFrame>>` - Next frame, or `None` at end of stream
    ///
    /// # Errors
    ///
    /// Returns error only on I/O failure of the underlying source.
    pub async fn next_frame(&mut self) -> Result<Option<CanFrame>> {
        loop {
            while let Some(record) = self.take_record() {
                match decode_record(&record) {
                    Ok(Some(frame)) => return Ok(Some(frame)),
                    Ok(None) => {}
                    Err(e) => warn!("Skipping malformed record: {}", e),
                }
            }

            if self.buffer.len() > SLCAN_MAX_RECORD {
                warn!("Discarding {} bytes without terminator", self.buffer.len());
                self.buffer.clear();
            }

            let read = self.inner.read_buf(&mut self.buffer).await?;
            if read == 0 {
                debug!("SLCAN stream closed");
                return Ok(None);
            }
        }
    }

    /// Pop the next terminated record, dropping empty lines and bell bytes
    fn take_record(&mut self) -> Option<BytesMut> {
        loop {
            let end = self.buffer.iter().position(|&b| b == SLCAN_CR || b == b'\n')?;
            let mut record = self.buffer.split_to(end);
            self.buffer.advance(1);

            while record.first() == Some(&SLCAN_BELL) {
                record.advance(1);
            }
            if !record.is_empty() {
                return Some(record);
            }
        }
    }

    /// Unwrap the underlying source
    pub fn into_inner(self) -> R {
        self.inner
    }
}
