//! Register bus abstraction for the MAC peripheral
//!
//! The driver never touches an address directly. It talks to a
//! [`RegisterBus`], which may be a real mapping of the register window, a
//! pointer handed over by platform code, or an in-memory simulation.

use crate::backends::mmap::MmapRegion;
use crate::backends::software::{SimFault, SimulatedMac};
use crate::error::{MacError, Result};
use mac_chip::StatusProtocol;
use std::fmt::Debug;
use std::path::PathBuf;

/// Access to the peripheral's register file
///
/// Offsets are byte offsets from the peripheral base (see [`mac_chip::regs`]).
/// Reads take `&mut self`: a status read can advance hardware state.
pub trait RegisterBus: Debug + Send {
    /// Read one byte (used for STATUS)
    ///
    /// # Errors
    ///
    /// Returns error if the offset is outside the window or not readable.
    fn read8(&mut self, offset: usize) -> Result<u8>;

    /// Read a 32-bit register
    ///
    /// # Errors
    ///
    /// Returns error if the offset is outside the window or not readable.
    fn read32(&mut self, offset: usize) -> Result<u32>;

    /// Write a 32-bit register
    ///
    /// # Errors
    ///
    /// Returns error if the offset is outside the window or not writable.
    fn write32(&mut self, offset: usize, value: u32) -> Result<()>;

    /// Get backend type for debugging
    fn backend_type(&self) -> BackendType;
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read8(&mut self, offset: usize) -> Result<u8> {
        (**self).read8(offset)
    }

    fn read32(&mut self, offset: usize) -> Result<u32> {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        (**self).write32(offset, value)
    }

    fn backend_type(&self) -> BackendType {
        (**self).backend_type()
    }
}

/// Backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Device file mapped into the process (`/dev/mem`, UIO)
    Mmap,

    /// Pre-mapped base pointer supplied by the caller
    Raw,

    /// In-memory simulation of the peripheral
    Software,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mmap => write!(f, "Mmap"),
            Self::Raw => write!(f, "Raw"),
            Self::Software => write!(f, "Software (simulated MAC)"),
        }
    }
}

/// Backend selection strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSelection {
    /// Map the register window out of a device file
    Mmap {
        /// Device node, e.g. `/dev/mem` or `/dev/uio0`
        path: PathBuf,
        /// Page-aligned physical base of the peripheral within `path`
        base: u64,
    },

    /// Simulated peripheral, for CI and for checking the self-test logic
    Software {
        /// Status encoding the simulation reports
        protocol: StatusProtocol,
        /// Busy status polls per operation
        latency: u32,
        /// Injected misbehaviour, if any
        fault: Option<SimFault>,
    },
}

/// Parse a peripheral base address.
///
/// `0x`/`0X` selects hex, anything else is decimal. Underscores are allowed
/// as digit separators. Every tool that reads `MAC_BASE` goes through here.
///
/// # Errors
///
/// Returns [`MacError::InvalidAddress`] if the text is not a `u64`.
pub fn parse_addr(s: &str) -> Result<u64> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| MacError::invalid_address(s, e))
}

/// Build the backend named by `selection`
///
/// # Errors
///
/// Returns error if the selected backend cannot be initialized.
pub fn select_backend(selection: &BackendSelection) -> Result<Box<dyn RegisterBus>> {
    match selection {
        BackendSelection::Mmap { path, base } => {
            let region = MmapRegion::open(path, *base)?;
            tracing::info!("Using mmap backend: {}", path.display());
            Ok(Box::new(region))
        }
        BackendSelection::Software {
            protocol,
            latency,
            fault,
        } => {
            tracing::info!("Using software backend ({protocol}, latency {latency})");
            let mut sim = SimulatedMac::new(*protocol).with_latency(*latency);
            if let Some(fault) = fault {
                tracing::info!("Software backend fault injected: {fault:?}");
                sim = sim.with_fault(*fault);
            }
            Ok(Box::new(sim))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mac_chip::regs;

    #[test]
    fn software_selection_yields_working_bus() {
        let mut bus = select_backend(&BackendSelection::Software {
            protocol: StatusProtocol::IdleWhenZero,
            latency: 0,
            fault: None,
        })
        .unwrap();
        assert_eq!(bus.backend_type(), BackendType::Software);
        bus.write32(regs::MAC, 7).unwrap();
        assert_eq!(bus.read32(regs::MAC).unwrap(), 7);
    }

    #[test]
    fn addresses_are_hex_only_with_prefix() {
        assert_eq!(parse_addr("0x1000_0000").unwrap(), 0x1000_0000);
        assert_eq!(parse_addr("0X1000").unwrap(), 0x1000);
        assert_eq!(parse_addr("4096").unwrap(), 0x1000);
        assert_eq!(parse_addr("0").unwrap(), 0);
    }

    #[test]
    fn bad_addresses_are_rejected() {
        for bad in ["", "0x", "0xZZ", "1000h", "-4096", "0x1_0000_0000_0000_0000"] {
            let err = parse_addr(bad).unwrap_err();
            assert!(matches!(err, MacError::InvalidAddress { .. }), "{bad}: {err}");
            assert_eq!(err.exit_code(), 2);
        }
    }

    #[test]
    fn mmap_selection_reports_missing_device() {
        let err = select_backend(&BackendSelection::Mmap {
            path: PathBuf::from("/nonexistent/mac-device"),
            base: 0,
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
