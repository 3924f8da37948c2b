//! Register map for the MAC peripheral.
//!
//! All offsets are byte offsets from the peripheral base. The register file
//! is four 32-bit words; STATUS is read as a single byte.
//!
//! ```text
//! 0x1000  STATUS  r    readiness / busy / completion flags
//! 0x1004  X       w    first operand
//! 0x1008  Y       w    second operand, write starts MAC += X * Y
//! 0x100C  MAC     rw   accumulator, write sets (0 resets)
//! ```

// ── Register offsets ─────────────────────────────────────────────────────────

/// Status register (8-bit reads).
pub const STATUS: usize = 0x1000;
/// First operand input.
pub const X: usize = 0x1004;
/// Second operand input. Writing it launches one multiply-accumulate.
pub const Y: usize = 0x1008;
/// Accumulated product-sum result.
pub const MAC: usize = 0x100C;

// ── Window ───────────────────────────────────────────────────────────────────

/// First byte of the register file.
pub const WINDOW_START: usize = STATUS;
/// One past the last byte of the register file.
pub const WINDOW_END: usize = MAC + 4;
/// Bytes a mapping must cover, measured from the peripheral base.
pub const WINDOW_SPAN: usize = WINDOW_END;

/// Human-readable name of a register offset, if it is one.
pub const fn name(offset: usize) -> Option<&'static str> {
    match offset {
        STATUS => Some("STATUS"),
        X => Some("X"),
        Y => Some("Y"),
        MAC => Some("MAC"),
        _ => None,
    }
}

/// All registers in address order, with names.
pub const ALL: [(usize, &str); 4] = [(STATUS, "STATUS"), (X, "X"), (Y, "Y"), (MAC, "MAC")];

// ── Status register bit definitions ──────────────────────────────────────────

/// Bits of the STATUS byte under the ready/done encoding.
///
/// The idle-when-zero encoding has no named bits: any nonzero value is busy.
pub mod status {
    /// An operation has completed and MAC holds its result.
    pub const DONE: u8 = 1 << 0;
    /// The peripheral accepts a new operand pair.
    pub const READY: u8 = 1 << 1;
    /// Value the idle-when-zero encoding reports while an operation runs.
    pub const BUSY: u8 = 1 << 0;
}
