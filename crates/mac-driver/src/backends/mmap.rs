//! Memory-mapped register window
//!
//! Maps the page(s) holding the MAC register file out of a device node
//! (`/dev/mem`, a UIO device, or any file standing in for one) and
//! delegates bounds-checked volatile access to [`RawRegisters`].

use super::raw::RawRegisters;
use crate::backend::{BackendType, RegisterBus};
use crate::error::{MacError, Result};
use mac_chip::regs;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// Register window mapped from a device file
///
/// The mapping is unmapped on drop; the file stays open for its lifetime.
#[derive(Debug)]
pub struct MmapRegion {
    regs: RawRegisters,
    _file: File,
    path: PathBuf,
    base: u64,
}

impl MmapRegion {
    /// Map the MAC register window located at `base` within `path`.
    ///
    /// `base` is the peripheral base address; register offsets from
    /// [`mac_chip::regs`] are added to it. It must be page aligned.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `base` is not page aligned
    /// - the file cannot be opened read/write
    /// - a regular file is too short to back the window
    /// - mmap fails
    pub fn open(path: impl AsRef<Path>, base: u64) -> Result<Self> {
        let path = path.as_ref();
        let page = rustix::param::page_size();
        let len = regs::WINDOW_SPAN.div_ceil(page) * page;

        if base % page as u64 != 0 {
            return Err(MacError::mapping_failed(format!(
                "base {base:#x} is not aligned to the {page:#x} byte page size"
            )));
        }

        let end = base.checked_add(len as u64).ok_or_else(|| {
            MacError::mapping_failed(format!(
                "window end overflows: base {base:#x} + {len:#x} bytes"
            ))
        })?;

        tracing::debug!("Mapping MAC window: {} @ {base:#x} ({len:#x} bytes)", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| MacError::mapping_failed(format!("Cannot open {}: {e}", path.display())))?;

        // Character devices report length 0; only regular files can be short.
        let meta = file.metadata()?;
        if meta.is_file() && meta.len() < end {
            return Err(MacError::mapping_failed(format!(
                "{} is {} bytes, window needs {end:#x}",
                path.display(),
                meta.len(),
            )));
        }

        // SAFETY: the fd is open for read/write, len is non-zero and a whole
        // number of pages, base is page aligned. The mapping is owned by the
        // returned value and released in Drop.
        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                base,
            )
            .map_err(|e| MacError::mapping_failed(format!("mmap failed: {e}")))?
        };

        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| MacError::mapping_failed("mmap returned a null pointer"))?;

        tracing::info!("Mapped MAC registers from {} @ {base:#x} at {ptr:p}", path.display());

        Ok(Self {
            // SAFETY: ptr is a fresh, page-aligned, exclusively owned mapping
            // of len bytes that lives until Drop.
            regs: unsafe { RawRegisters::new(ptr, len) },
            _file: file,
            path: path.to_path_buf(),
            base,
        })
    }

    /// Mapped length in bytes (a whole number of pages)
    #[must_use]
    pub const fn size(&self) -> usize {
        self.regs.len()
    }

    /// Device path the window was mapped from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Peripheral base within the device file
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }
}

impl RegisterBus for MmapRegion {
    fn read8(&mut self, offset: usize) -> Result<u8> {
        self.regs.read8(offset)
    }

    fn read32(&mut self, offset: usize) -> Result<u32> {
        self.regs.read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.regs.write32(offset, value)
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Mmap
    }
}

impl Drop for MmapRegion {
    fn drop(&mut self) {
        tracing::debug!("Unmapping MAC window from {} @ {:#x}", self.path.display(), self.base);

        // SAFETY: base/len are exactly what mmap returned in open(), and no
        // reference into the mapping outlives self.
        unsafe {
            if let Err(e) = munmap(self.regs.base().as_ptr().cast(), self.regs.len()) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    fn backing_file(len: u64) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(len).unwrap();
        file
    }

    #[test]
    fn writes_land_in_backing_file() {
        let page = rustix::param::page_size() as u64;
        let file = backing_file(page * 2);
        {
            let mut region = MmapRegion::open(file.path(), 0).unwrap();
            assert!(region.size() >= regs::WINDOW_SPAN);
            assert_eq!(region.backend_type(), BackendType::Mmap);
            region.write32(regs::MAC, 0x0102_0304).unwrap();
            assert_eq!(region.read32(regs::MAC).unwrap(), 0x0102_0304);
        }

        let mut raw = [0u8; 4];
        let mut f = file.reopen().unwrap();
        f.seek(SeekFrom::Start(regs::MAC as u64)).unwrap();
        f.read_exact(&mut raw).unwrap();
        assert_eq!(u32::from_ne_bytes(raw), 0x0102_0304);
    }

    #[test]
    fn rejects_unaligned_base() {
        let file = backing_file(0x10000);
        let err = MmapRegion::open(file.path(), 0x10).unwrap_err();
        assert!(matches!(err, MacError::MappingFailed { .. }), "{err}");
    }

    #[test]
    fn rejects_base_at_top_of_address_space() {
        let page = rustix::param::page_size() as u64;
        let file = backing_file(page);
        let err = MmapRegion::open(file.path(), u64::MAX - page + 1).unwrap_err();
        assert!(err.to_string().contains("window end overflows"), "{err}");
    }

    #[test]
    fn rejects_short_regular_file() {
        let file = backing_file(16);
        let err = MmapRegion::open(file.path(), 0).unwrap_err();
        assert!(err.to_string().contains("window needs"), "{err}");
    }

    #[test]
    fn accesses_past_mapping_are_refused() {
        let file = backing_file(rustix::param::page_size() as u64 * 2);
        let mut region = MmapRegion::open(file.path(), 0).unwrap();
        let end = region.size();
        assert!(matches!(
            region.read32(end),
            Err(MacError::OutOfBounds { .. })
        ));
    }
}
