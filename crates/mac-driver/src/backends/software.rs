// SPDX-License-Identifier: AGPL-3.0-only

//! Software (simulated MAC) backend
//!
//! Implements [`RegisterBus`] over an in-memory register file that behaves
//! like the peripheral: a write to Y latches the operand pair and, after a
//! configurable number of busy status polls, adds `X * Y` to the
//! accumulator. This lets the driver and self-test run in CI without
//! hardware, and lets tests provoke the failure paths (stuck peripheral,
//! wrong result) on demand.
//!
//! ## Timing model
//!
//! ```text
//! write Y ──► busy for `latency` STATUS reads ──► MAC += X * Y, DONE
//! ```
//!
//! Time only advances on STATUS reads. A latency of 0 completes the
//! operation inside the Y write.

use crate::backend::{BackendType, RegisterBus};
use crate::error::{MacError, Result};
use mac_chip::{regs, StatusProtocol};
use tracing::{debug, trace};

/// Misbehaviour the simulation can be told to exhibit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    /// Never leaves the busy state; polls without a bound hang
    Stuck,
    /// MAC reads return the true accumulator plus this amount (wrapping)
    ResultSkew(u32),
    /// MAC reads always return this value
    ForcedResult(u32),
}

/// Access counters kept by the simulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Register reads of any width
    pub reads: u64,
    /// Register writes
    pub writes: u64,
    /// Reads of STATUS
    pub status_polls: u64,
    /// Multiply-accumulates that completed
    pub operations: u64,
}

/// Simulated MAC peripheral.
#[derive(Debug, Clone)]
pub struct SimulatedMac {
    protocol: StatusProtocol,
    latency: u32,
    fault: Option<SimFault>,

    x: u32,
    y: u32,
    acc: u32,

    /// Remaining busy polls of the operation in flight
    pending: Option<u32>,
    /// A completed result is latched (ready/done encoding only)
    done: bool,

    stats: SimStats,
}

impl SimulatedMac {
    /// Idle peripheral with a zeroed register file and no latency.
    pub fn new(protocol: StatusProtocol) -> Self {
        Self {
            protocol,
            latency: 0,
            fault: None,
            x: 0,
            y: 0,
            acc: 0,
            pending: None,
            done: false,
            stats: SimStats::default(),
        }
    }

    /// Keep each operation busy for `polls` STATUS reads.
    #[must_use]
    pub fn with_latency(mut self, polls: u32) -> Self {
        self.latency = polls;
        self
    }

    /// Inject a fault.
    #[must_use]
    pub fn with_fault(mut self, fault: SimFault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Start with a nonzero accumulator, as hardware may after a prior run.
    #[must_use]
    pub fn with_accumulator(mut self, acc: u32) -> Self {
        self.acc = acc;
        self
    }

    /// Status encoding this simulation reports
    pub const fn protocol(&self) -> StatusProtocol {
        self.protocol
    }

    /// True accumulator value, ignoring any injected fault
    pub const fn accumulator(&self) -> u32 {
        self.acc
    }

    /// True while an operation is in flight
    pub const fn is_busy(&self) -> bool {
        self.pending.is_some() || matches!(self.fault, Some(SimFault::Stuck))
    }

    /// Access counters so far
    pub const fn stats(&self) -> SimStats {
        self.stats
    }

    fn complete(&mut self) {
        self.acc = self.acc.wrapping_add(self.x.wrapping_mul(self.y));
        self.pending = None;
        self.done = true;
        self.stats.operations += 1;
        debug!("SimulatedMac: {} * {} accumulated, MAC = {}", self.x, self.y, self.acc);
    }

    /// Advance the operation in flight by one STATUS read.
    fn tick(&mut self) {
        if matches!(self.fault, Some(SimFault::Stuck)) {
            return;
        }
        match self.pending {
            Some(0) => self.complete(),
            Some(n) => self.pending = Some(n - 1),
            None => {}
        }
    }

    fn status_byte(&mut self) -> u8 {
        self.stats.status_polls += 1;
        self.tick();
        self.protocol.encode(self.is_busy(), self.done)
    }

    fn check_operand_write(&self, offset: usize) -> Result<()> {
        if self.is_busy() {
            return Err(MacError::invalid_state(format!(
                "{} written while an operation is in flight",
                regs::name(offset).unwrap_or("operand")
            )));
        }
        Ok(())
    }

    fn mac_readback(&self) -> u32 {
        match self.fault {
            Some(SimFault::ResultSkew(n)) => self.acc.wrapping_add(n),
            Some(SimFault::ForcedResult(v)) => v,
            Some(SimFault::Stuck) | None => self.acc,
        }
    }

    /// Value of a non-STATUS register; reading these has no side effects.
    fn data_register(&self, offset: usize) -> Option<u32> {
        match offset {
            regs::X => Some(self.x),
            regs::Y => Some(self.y),
            regs::MAC => Some(self.mac_readback()),
            _ => None,
        }
    }
}

impl RegisterBus for SimulatedMac {
    fn read8(&mut self, offset: usize) -> Result<u8> {
        self.stats.reads += 1;
        match offset {
            regs::STATUS => Ok(self.status_byte()),
            // Low byte of the word; only STATUS is specified as a byte register.
            _ => self
                .data_register(offset)
                .map(|word| word.to_le_bytes()[0])
                .ok_or_else(|| MacError::invalid_access(offset, "no register at this offset")),
        }
    }

    fn read32(&mut self, offset: usize) -> Result<u32> {
        self.stats.reads += 1;
        let value = match offset {
            regs::STATUS => u32::from(self.status_byte()),
            _ => self
                .data_register(offset)
                .ok_or_else(|| MacError::invalid_access(offset, "no register at this offset"))?,
        };
        trace!("SimulatedMac: read {offset:#x} = {value:#x}");
        Ok(value)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.stats.writes += 1;
        trace!("SimulatedMac: write {offset:#x} = {value:#x}");
        match offset {
            regs::STATUS => {
                return Err(MacError::invalid_access(offset, "STATUS is read-only"));
            }
            regs::X => {
                self.check_operand_write(offset)?;
                self.x = value;
            }
            regs::Y => {
                self.check_operand_write(offset)?;
                self.y = value;
                self.done = false;
                self.pending = Some(self.latency);
                if self.latency == 0 && !matches!(self.fault, Some(SimFault::Stuck)) {
                    self.complete();
                }
            }
            regs::MAC => self.acc = value,
            _ => return Err(MacError::invalid_access(offset, "no register at this offset")),
        }
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Software
    }
}
