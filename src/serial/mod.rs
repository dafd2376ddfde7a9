//! # Serial Communication Module
//!
//! Handles the serial link to a USB SLCAN adapter.
//!
//! This module handles:
//! - Opening the adapter port (8N1, configured baud rate)
//! - Auto-detecting the device among common paths
//! - Reading SLCAN records and yielding CAN frames
//!
//! The link is listen-only: the adapter is expected to already be open on
//! the bus at the right bitrate, and nothing is written to it.

use crate::can::{CanFrame, SlcanReader};
use crate::error::{BmsError, Result};
use tokio::io::AsyncRead;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Default baud rate for USB SLCAN adapters
pub const SLCAN_BAUD_RATE: u32 = 115_200;

/// Default adapter device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC adapters (CANable, most common)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// SLCAN adapter handle
///
/// Wraps the serial stream in an [`SlcanReader`]. Any other byte stream
/// can stand in for the port through [`CanSerial::from_reader`].
pub struct CanSerial<R = tokio_serial::SerialStream> {
    reader: SlcanReader<R>,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
}

impl<R> std::fmt::Debug for CanSerial<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl CanSerial {
    /// Open the adapter at one of the default paths
    ///
    /// # Errors
    ///
    /// Returns error if no adapter could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bms_can_monitor::serial::CanSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = CanSerial::open()?;
    ///     Ok(())
    /// }
    /// ```
    pub fn open() -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, SLCAN_BAUD_RATE)
    }

    /// Open the adapter trying each path in order
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
    /// * `baud_rate` - Serial baud rate
    ///
    /// # Returns
    ///
    /// * `Result<CanSerial>` - Connected adapter or error
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened SLCAN adapter at {} ({} baud)", path, baud_rate);
                    return Ok(Self::from_reader(path, port));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(BmsError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| BmsError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

impl<R: AsyncRead + Unpin> CanSerial<R> {
    /// Wrap an already-open byte stream
    ///
    /// # Arguments
    ///
    /// * `device_path` - Name used in log and error messages
    /// * `stream` - Source of SLCAN records
    pub fn from_reader(device_path: &str, stream: R) -> Self {
        Self {
            reader: SlcanReader::new(stream),
            device_path: device_path.to_string(),
        }
    }

    /// Wait for the next CAN frame from the adapter
    ///
    /// # Returns
    ///
    /// * `Result<CanFrame>` - Next received frame
    ///
    /// # Errors
    ///
    /// Returns error if the port fails or is closed
    pub async fn next_frame(&mut self) -> Result<CanFrame> {
        match self.reader.next_frame().await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(BmsError::Serial(format!(
                "Adapter at {} closed the stream",
                self.device_path
            ))),
            Err(e) => Err(BmsError::Serial(format!("Failed to read frame: {}", e))),
        }
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}
