//! Status register encodings.
//!
//! Two revisions of the peripheral report progress differently through the
//! same STATUS byte. The driver polls against a [`StatusProtocol`] rather
//! than hard-coding either encoding.

use crate::regs::status;

/// How the STATUS byte signals readiness and completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusProtocol {
    /// Zero means idle; any other value means an operation is in flight.
    /// Ready and done are the same condition.
    IdleWhenZero,
    /// Bit 1 (`READY`) means operands may be written; bit 0 (`DONE`) means
    /// the last operation finished.
    ReadyDoneBits,
}

impl StatusProtocol {
    /// True if a new operand pair may be written.
    pub const fn is_ready(self, status_byte: u8) -> bool {
        match self {
            Self::IdleWhenZero => status_byte == 0,
            Self::ReadyDoneBits => status_byte & status::READY != 0,
        }
    }

    /// True if the last submitted operation has completed.
    pub const fn is_done(self, status_byte: u8) -> bool {
        match self {
            Self::IdleWhenZero => status_byte == 0,
            Self::ReadyDoneBits => status_byte & status::DONE != 0,
        }
    }

    /// Status byte a peripheral using this encoding reports.
    ///
    /// `busy` is an operation in flight, `done` means a completed result is
    /// latched in MAC.
    pub const fn encode(self, busy: bool, done: bool) -> u8 {
        match self {
            Self::IdleWhenZero => {
                if busy {
                    status::BUSY
                } else {
                    0
                }
            }
            Self::ReadyDoneBits => {
                if busy {
                    0
                } else if done {
                    status::READY | status::DONE
                } else {
                    status::READY
                }
            }
        }
    }
}

impl std::fmt::Display for StatusProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdleWhenZero => write!(f, "idle-when-zero"),
            Self::ReadyDoneBits => write!(f, "ready/done bits"),
        }
    }
}
