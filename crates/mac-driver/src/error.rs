//! Error types for MAC driver operations

use thiserror::Error;

/// Result type alias for MAC driver operations
pub type Result<T> = std::result::Result<T, MacError>;

/// Errors that can occur while driving or testing the MAC peripheral
#[derive(Debug, Error)]
pub enum MacError {
    /// The peripheral's accumulator disagrees with the software reference
    #[error("Hardware result {hardware} does not match reference value {reference}")]
    ResultMismatch {
        /// Value read back from the MAC register
        hardware: u32,
        /// Value computed by the reference function
        reference: u32,
    },

    /// A bounded status poll ran out before the condition held
    #[error(
        "Timed out waiting for peripheral {condition} after {polls} status polls ({elapsed_ms}ms)"
    )]
    Timeout {
        /// Condition that was being waited on (`ready` / `done`)
        condition: &'static str,
        /// Number of status reads performed
        polls: u64,
        /// Wall-clock time spent polling
        elapsed_ms: u64,
    },

    /// Register access outside the mapped window
    #[error("Out of bounds access: offset={offset:#x}, width={width}, limit={limit:#x}")]
    OutOfBounds {
        /// Requested byte offset
        offset: usize,
        /// Access width in bytes
        width: usize,
        /// Size of the mapped window
        limit: usize,
    },

    /// Access the register file does not permit
    #[error("Invalid access at {offset:#x}: {reason}")]
    InvalidAccess {
        /// Requested byte offset
        offset: usize,
        /// Why the access was refused
        reason: String,
    },

    /// Peripheral is in a state that forbids the operation
    #[error("Peripheral in invalid state: {state}")]
    InvalidState {
        /// Current state description
        state: String,
    },

    /// Opening or mapping the register window failed
    #[error("Register mapping failed: {reason}")]
    MappingFailed {
        /// Reason for failure
        reason: String,
    },

    /// Peripheral base address could not be parsed
    #[error("Invalid address '{input}': {reason}")]
    InvalidAddress {
        /// Text as given
        input: String,
        /// Parser complaint
        reason: String,
    },

    /// I/O error while talking to the device node
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl MacError {
    /// Create a result mismatch error
    pub const fn mismatch(hardware: u32, reference: u32) -> Self {
        Self::ResultMismatch {
            hardware,
            reference,
        }
    }

    /// Create a poll timeout error
    pub const fn timeout(condition: &'static str, polls: u64, elapsed_ms: u64) -> Self {
        Self::Timeout {
            condition,
            polls,
            elapsed_ms,
        }
    }

    /// Create an out of bounds error
    pub const fn out_of_bounds(offset: usize, width: usize, limit: usize) -> Self {
        Self::OutOfBounds {
            offset,
            width,
            limit,
        }
    }

    /// Create an invalid access error
    pub fn invalid_access(offset: usize, reason: impl Into<String>) -> Self {
        Self::InvalidAccess {
            offset,
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.into(),
        }
    }

    /// Create a mapping failed error
    pub fn mapping_failed(reason: impl Into<String>) -> Self {
        Self::MappingFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid address error
    pub fn invalid_address(input: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidAddress {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit status for this error.
    ///
    /// A mismatch is the one failure the self-test reports as `1`; every
    /// other error means the test could not complete and maps to `2`.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::ResultMismatch { .. } => 1,
            _ => 2,
        }
    }

    /// True if this is a hardware/reference disagreement
    pub const fn is_mismatch(&self) -> bool {
        matches!(self, Self::ResultMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_keeps_legacy_wording() {
        let err = MacError::mismatch(12, 16);
        assert_eq!(
            err.to_string(),
            "Hardware result 12 does not match reference value 16"
        );
        assert_eq!(err.exit_code(), 1);
        assert!(err.is_mismatch());
    }

    #[test]
    fn non_mismatch_errors_exit_with_two() {
        assert_eq!(MacError::timeout("done", 10, 0).exit_code(), 2);
        assert_eq!(MacError::out_of_bounds(0x2000, 4, 0x1010).exit_code(), 2);
        assert_eq!(MacError::invalid_state("busy").exit_code(), 2);
        let io: MacError = std::io::Error::other("gone").into();
        assert_eq!(io.exit_code(), 2);
    }

    #[test]
    fn results_print_unsigned() {
        // 0x8000_0000 and u32::MAX print as themselves, not as negative i32s.
        let err = MacError::mismatch(0x8000_0000, u32::MAX);
        assert_eq!(
            err.to_string(),
            "Hardware result 2147483648 does not match reference value 4294967295"
        );
    }

    #[test]
    fn out_of_bounds_formats_hex() {
        let msg = MacError::out_of_bounds(0x1010, 4, 0x1010).to_string();
        assert!(msg.contains("offset=0x1010"), "{msg}");
        assert!(msg.contains("limit=0x1010"), "{msg}");
    }
}
