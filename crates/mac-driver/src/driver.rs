//! Register-level MAC operations
//!
//! [`MacDriver`] owns a [`RegisterBus`] and exposes the handful of
//! operations the peripheral supports: reset the accumulator, submit an
//! operand pair, poll STATUS, read the result.

use crate::backend::RegisterBus;
use crate::error::{MacError, Result};
use mac_chip::{regs, StatusProtocol};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Default upper bound on status reads per wait
pub const DEFAULT_MAX_POLLS: u64 = 1_000_000;

/// Bounds on a status poll
///
/// A wait gives up with [`MacError::Timeout`] once either bound is hit.
/// With neither bound set the wait spins until the condition holds, which
/// on an unresponsive peripheral is forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum STATUS reads
    pub max_polls: Option<u64>,
    /// Maximum wall-clock time
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_polls: Some(DEFAULT_MAX_POLLS),
            timeout: None,
        }
    }
}

impl PollConfig {
    /// Spin without bound (bare-metal behaviour)
    pub const fn unbounded() -> Self {
        Self {
            max_polls: None,
            timeout: None,
        }
    }

    /// Limit the number of status reads
    #[must_use]
    pub const fn with_max_polls(mut self, polls: u64) -> Self {
        self.max_polls = Some(polls);
        self
    }

    /// Limit wall-clock time
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// True if neither bound is set
    pub const fn is_unbounded(&self) -> bool {
        self.max_polls.is_none() && self.timeout.is_none()
    }
}

/// Driver for one MAC peripheral
#[derive(Debug)]
pub struct MacDriver<B: RegisterBus> {
    bus: B,
    protocol: StatusProtocol,
    poll: PollConfig,
    /// Status reads across all waits
    total_polls: u64,
}

impl<B: RegisterBus> MacDriver<B> {
    /// Drive the peripheral on `bus`, decoding STATUS with `protocol`
    pub fn new(bus: B, protocol: StatusProtocol) -> Self {
        debug!("MacDriver on {} backend, status {protocol}", bus.backend_type());
        Self {
            bus,
            protocol,
            poll: PollConfig::default(),
            total_polls: 0,
        }
    }

    /// Replace the poll bounds
    #[must_use]
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Current poll bounds
    pub const fn poll_config(&self) -> PollConfig {
        self.poll
    }

    /// Status encoding in use
    pub const fn protocol(&self) -> StatusProtocol {
        self.protocol
    }

    /// Status reads performed by waits so far
    pub const fn total_polls(&self) -> u64 {
        self.total_polls
    }

    /// Borrow the underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrow the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the bus
    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Zero the accumulator.
    ///
    /// # Errors
    ///
    /// Returns error if the bus write fails.
    pub fn reset_accumulator(&mut self) -> Result<()> {
        debug!("Reset accumulator");
        self.bus.write32(regs::MAC, 0)
    }

    /// Write `x` then `y`. The write to Y starts the operation.
    ///
    /// The caller must have observed the peripheral ready first.
    ///
    /// # Errors
    ///
    /// Returns error if either bus write fails.
    pub fn submit_operand_pair(&mut self, x: u32, y: u32) -> Result<()> {
        debug!("Submit operands x={x} y={y}");
        self.bus.write32(regs::X, x)?;
        self.bus.write32(regs::Y, y)
    }

    /// Read the accumulator.
    ///
    /// # Errors
    ///
    /// Returns error if the bus read fails.
    pub fn read_result(&mut self) -> Result<u32> {
        let value = self.bus.read32(regs::MAC)?;
        debug!("Read result {value}");
        Ok(value)
    }

    /// Raw STATUS byte.
    ///
    /// # Errors
    ///
    /// Returns error if the bus read fails.
    pub fn status(&mut self) -> Result<u8> {
        self.bus.read8(regs::STATUS)
    }

    /// Poll until the peripheral accepts operands.
    ///
    /// # Errors
    ///
    /// Returns [`MacError::Timeout`] if a poll bound is exhausted, or the
    /// bus error if a status read fails.
    pub fn wait_ready(&mut self) -> Result<()> {
        let protocol = self.protocol;
        self.wait_for("ready", |s| protocol.is_ready(s))
    }

    /// Poll until the last operation has completed.
    ///
    /// # Errors
    ///
    /// Returns [`MacError::Timeout`] if a poll bound is exhausted, or the
    /// bus error if a status read fails.
    pub fn wait_done(&mut self) -> Result<()> {
        let protocol = self.protocol;
        self.wait_for("done", |s| protocol.is_done(s))
    }

    fn wait_for(&mut self, condition: &'static str, holds: impl Fn(u8) -> bool) -> Result<()> {
        let start = Instant::now();
        let mut polls: u64 = 0;

        loop {
            let status = self.bus.read8(regs::STATUS)?;
            polls += 1;
            if holds(status) {
                self.total_polls += polls;
                trace!("{condition} after {polls} polls (status {status:#04x})");
                return Ok(());
            }

            let over_polls = self.poll.max_polls.is_some_and(|max| polls >= max);
            let over_time = self.poll.timeout.is_some_and(|t| start.elapsed() >= t);
            if over_polls || over_time {
                self.total_polls += polls;
                #[allow(clippy::cast_possible_truncation)]
                let elapsed_ms = start.elapsed().as_millis() as u64;
                warn!("Peripheral not {condition} after {polls} polls, last status {status:#04x}");
                return Err(MacError::timeout(condition, polls, elapsed_ms));
            }

            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::software::{SimFault, SimulatedMac};

    fn driver(protocol: StatusProtocol, latency: u32) -> MacDriver<SimulatedMac> {
        MacDriver::new(SimulatedMac::new(protocol).with_latency(latency), protocol)
    }

    #[test]
    fn reset_then_read_is_zero() {
        let sim = SimulatedMac::new(StatusProtocol::IdleWhenZero).with_accumulator(0xFFFF_0000);
        let mut d = MacDriver::new(sim, StatusProtocol::IdleWhenZero);
        d.reset_accumulator().unwrap();
        assert_eq!(d.read_result().unwrap(), 0);
    }

    #[test]
    fn submit_then_wait_yields_product() {
        let mut d = driver(StatusProtocol::ReadyDoneBits, 2);
        d.wait_ready().unwrap();
        d.submit_operand_pair(6, 7).unwrap();
        d.wait_done().unwrap();
        assert_eq!(d.read_result().unwrap(), 42);
        assert_eq!(d.bus().stats().writes, 2);
    }

    #[test]
    fn wait_counts_polls() {
        let mut d = driver(StatusProtocol::IdleWhenZero, 4);
        d.submit_operand_pair(1, 1).unwrap();
        d.wait_done().unwrap();
        // four busy reads, then the one that sees idle
        assert_eq!(d.total_polls(), 5);
    }

    #[test]
    fn stuck_peripheral_times_out_on_poll_bound() {
        let sim = SimulatedMac::new(StatusProtocol::ReadyDoneBits).with_fault(SimFault::Stuck);
        let mut d = MacDriver::new(sim, StatusProtocol::ReadyDoneBits)
            .with_poll_config(PollConfig::unbounded().with_max_polls(50));
        let err = d.wait_ready().unwrap_err();
        match err {
            MacError::Timeout { condition, polls, .. } => {
                assert_eq!(condition, "ready");
                assert_eq!(polls, 50);
            }
            other => panic!("expected timeout, got {other}"),
        }
        assert_eq!(d.bus().stats().status_polls, 50);
    }

    #[test]
    fn stuck_peripheral_times_out_on_deadline() {
        let sim = SimulatedMac::new(StatusProtocol::IdleWhenZero).with_fault(SimFault::Stuck);
        let mut d = MacDriver::new(sim, StatusProtocol::IdleWhenZero)
            .with_poll_config(PollConfig::unbounded().with_timeout(Duration::from_millis(5)));
        let err = d.wait_done().unwrap_err();
        assert!(matches!(err, MacError::Timeout { condition: "done", .. }), "{err}");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn poll_config_builders() {
        assert!(PollConfig::unbounded().is_unbounded());
        assert!(!PollConfig::default().is_unbounded());
        assert_eq!(PollConfig::default().max_polls, Some(DEFAULT_MAX_POLLS));
        let p = PollConfig::unbounded().with_timeout(Duration::from_secs(1));
        assert_eq!(p.max_polls, None);
        assert_eq!(p.timeout, Some(Duration::from_secs(1)));
    }
}
