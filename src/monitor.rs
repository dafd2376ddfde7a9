//! # Monitor Loop
//!
//! Receive loop behind the `bms-monitor` binary.
//!
//! This module handles:
//! - Decoding every received frame into the battery state
//! - Building a report every report interval once frames have arrived
//! - Reopening the adapter after a fixed delay when it fails or closes
//! - Stopping when the shutdown future completes

use std::future::Future;
use tokio::io::AsyncRead;
use tokio::time::{interval, sleep_until, Duration, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::bms::{BatteryState, BmsDecoder};
use crate::can::CanFrame;
use crate::clock::TickSource;
use crate::config::Config;
use crate::error::Result;
use crate::serial::CanSerial;
use crate::telemetry::{FrameStats, StateReport};

/// Loop timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub report_interval: Duration,
    /// Delay between a failure and the next open attempt
    pub reconnect_delay: Duration,
}

impl From<&Config> for MonitorSettings {
    fn from(config: &Config) -> Self {
        Self {
            report_interval: Duration::from_millis(config.report.interval_ms),
            reconnect_delay: Duration::from_millis(config.serial.reconnect_interval_ms),
        }
    }
}

/// What the loop saw before it stopped
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorSummary {
    pub state: BatteryState,
    pub frames: FrameStats,
    /// Reports handed to the report callback
    pub reports: u64,
    /// Open attempts made after the initial one
    pub reconnect_attempts: u64,
}

enum Event {
    Frame(Result<CanFrame>),
    Reconnect,
    Report,
    Shutdown,
}

/// Run the receive loop until `shutdown` completes
///
/// The adapter is opened once up front. A failed open, a read error, or the
/// end of the stream drops the adapter and schedules the next attempt
/// `reconnect_delay` later. The deadline only moves after an attempt, so
/// report ticks never postpone it.
///
/// # Arguments
///
/// * `decoder` - Identifier table to decode with
/// * `settings` - Report and reconnect timing
/// * `open` - Opens the adapter; called for the first open and every reconnect
/// * `clock` - Tick source stamped into the state
/// * `shutdown` - Stops the loop when it completes
/// * `on_report` - Receives each report
///
/// # Returns
///
/// * `MonitorSummary` - Final state and counters
pub async fn run<R, O, T, S, F>(
    decoder: &BmsDecoder,
    settings: MonitorSettings,
    mut open: O,
    clock: &T,
    shutdown: S,
    mut on_report: F,
) -> MonitorSummary
where
    R: AsyncRead + Unpin,
    O: FnMut() -> Result<CanSerial<R>>,
    T: TickSource + ?Sized,
    S: Future<Output = ()>,
    F: FnMut(&StateReport),
{
    tokio::pin!(shutdown);

    let mut summary = MonitorSummary::default();
    let mut report_interval = interval(settings.report_interval);
    report_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut serial = match open() {
        Ok(port) => Some(port),
        Err(e) => {
            warn!("{}; retrying in {:?}", e, settings.reconnect_delay);
            None
        }
    };
    let mut reconnect_at = Instant::now() + settings.reconnect_delay;

    loop {
        let event = match serial.as_mut() {
            Some(port) => tokio::select! {
                result = port.next_frame() => Event::Frame(result),
                _ = report_interval.tick() => Event::Report,
                _ = &mut shutdown => Event::Shutdown,
            },
            None => tokio::select! {
                _ = sleep_until(reconnect_at) => Event::Reconnect,
                _ = report_interval.tick() => Event::Report,
                _ = &mut shutdown => Event::Shutdown,
            },
        };

        match event {
            Event::Frame(Ok(frame)) => {
                let recognised = decoder.apply_frame(&mut summary.state, &frame, clock.ticks());
                summary.frames.record(recognised);
            }
            Event::Frame(Err(e)) => {
                warn!("{}; reconnecting in {:?}", e, settings.reconnect_delay);
                serial = None;
                reconnect_at = Instant::now() + settings.reconnect_delay;
            }
            Event::Reconnect => {
                summary.reconnect_attempts += 1;
                match open() {
                    Ok(port) => {
                        info!("Reconnected to {}", port.device_path());
                        serial = Some(port);
                    }
                    Err(e) => {
                        warn!("Reconnect failed: {}", e);
                        reconnect_at = Instant::now() + settings.reconnect_delay;
                    }
                }
            }
            Event::Report => {
                if summary.frames.received == 0 {
                    info!("No frames received yet");
                    continue;
                }
                let report = StateReport::new(
                    &summary.state,
                    summary.frames,
                    clock.ticks(),
                    chrono::Utc::now(),
                );
                summary.reports += 1;
                on_report(&report);
            }
            Event::Shutdown => break,
        }
    }

    summary
}
