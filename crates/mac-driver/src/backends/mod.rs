//! Register bus implementations
//!
//! Three backends available:
//! - **Mmap**: maps the register window out of a device file (`/dev/mem`, UIO)
//! - **Raw**: wraps a base pointer that platform code has already mapped
//! - **Software**: simulated peripheral, no hardware required

pub mod mmap;
pub mod raw;
pub mod software;

pub use mmap::MmapRegion;
pub use raw::RawRegisters;
pub use software::{SimFault, SimStats, SimulatedMac};
