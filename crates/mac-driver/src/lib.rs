//! Register-level driver and self-test for a memory-mapped multiply-accumulate
//! (MAC) peripheral.
//!
//! The peripheral exposes four registers (see [`mac_chip::regs`]): STATUS,
//! two operand inputs X and Y, and the MAC accumulator. Writing Y launches
//! `MAC += X * Y`. The self-test feeds fixed operands, polls STATUS, reads the
//! accumulator back and compares it against a software reference.
//!
//! # Backends
//!
//! ```text
//! MmapRegion    : register window mapped from /dev/mem or a UIO node
//! RawRegisters  : base pointer mapped by platform code
//! SimulatedMac  : in-memory peripheral for CI and fault injection
//! ```
//!
//! # Quick start
//!
//! ```
//! use mac_driver::{run_self_test, SelfTest, SimulatedMac, Variant};
//!
//! let test = SelfTest::new(Variant::V3);
//! let bus = SimulatedMac::new(Variant::V3.status_protocol()).with_latency(4);
//! let pass = run_self_test(bus, &test)?;
//! assert_eq!(pass.to_string(), "Hardware result 6 is correct for MAC");
//! # Ok::<(), mac_driver::MacError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod backend;
pub mod backends;
mod driver;
mod error;
mod reference;
mod selftest;
mod variant;

/// Register map and status encodings (re-exported from mac-chip).
pub use mac_chip::{regs, StatusProtocol};

pub use backend::{parse_addr, select_backend, BackendSelection, BackendType, RegisterBus};
pub use backends::{MmapRegion, RawRegisters, SimFault, SimStats, SimulatedMac};
pub use driver::{MacDriver, PollConfig, DEFAULT_MAX_POLLS};
pub use error::{MacError, Result};
pub use reference::{reference_mac, TestVectors};
pub use selftest::{exit_code, run_self_test, SelfTest, SelfTestPass};
pub use variant::{SecondSubmission, Variant};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        reference_mac, run_self_test, MacDriver, MacError, PollConfig, RegisterBus, Result,
        SecondSubmission, SelfTest, SelfTestPass, SimulatedMac, TestVectors, Variant,
    };
}
