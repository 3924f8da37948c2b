//! Volatile access to an already-mapped register window

use crate::backend::{BackendType, RegisterBus};
use crate::error::{MacError, Result};
use std::ptr::NonNull;

/// Register window at a fixed base pointer
///
/// All accesses are bounds-checked against `len` and performed with
/// volatile loads and stores. 32-bit accesses must be word aligned.
#[derive(Debug)]
pub struct RawRegisters {
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: RawRegisters is the sole handle to the window it was built from
// (constructor contract), and every access goes through &mut self.
unsafe impl Send for RawRegisters {}

impl RawRegisters {
    /// Wrap a mapped register window.
    ///
    /// # Safety
    ///
    /// `base` must point to `len` bytes of readable and writable memory
    /// (device or otherwise) that stays valid for the lifetime of the
    /// returned value, and nothing else may access it concurrently. `base`
    /// must be at least 4-byte aligned.
    pub const unsafe fn new(base: NonNull<u8>, len: usize) -> Self {
        Self { base, len }
    }

    /// Size of the window in bytes
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if the window is empty
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Base pointer of the window
    pub const fn base(&self) -> NonNull<u8> {
        self.base
    }

    fn check(&self, offset: usize, width: usize) -> Result<()> {
        match offset.checked_add(width) {
            Some(end) if end <= self.len => {}
            _ => return Err(MacError::out_of_bounds(offset, width, self.len)),
        }
        if offset % width != 0 {
            return Err(MacError::invalid_access(
                offset,
                format!("unaligned {width}-byte access"),
            ));
        }
        Ok(())
    }
}

impl RegisterBus for RawRegisters {
    fn read8(&mut self, offset: usize) -> Result<u8> {
        self.check(offset, 1)?;
        // SAFETY: offset + 1 <= len was checked above and the window is valid
        // for len bytes per the constructor contract.
        let value = unsafe { self.base.as_ptr().add(offset).read_volatile() };
        tracing::trace!("Read u8 @ {offset:#x} = {value:#x}");
        Ok(value)
    }

    fn read32(&mut self, offset: usize) -> Result<u32> {
        self.check(offset, 4)?;
        // SAFETY: offset + 4 <= len and offset is word aligned (checked above);
        // base is word aligned per the constructor contract.
        #[allow(clippy::cast_ptr_alignment)]
        let value = unsafe { self.base.as_ptr().add(offset).cast::<u32>().read_volatile() };
        tracing::trace!("Read u32 @ {offset:#x} = {value:#x}");
        Ok(value)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.check(offset, 4)?;
        tracing::trace!("Write u32 @ {offset:#x} = {value:#x}");
        // SAFETY: same bounds and alignment argument as read32.
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            self.base
                .as_ptr()
                .add(offset)
                .cast::<u32>()
                .write_volatile(value);
        }
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Raw
    }
}
