//! Scoped host-memory pinning
//!
//! [`HostPinnedRegion`] registers an existing host range with the driver so
//! it is page-locked and reachable from the device at a stable mapped
//! address. Registration and unregistration are paired exactly once per
//! region; `Drop` is the safety net for error paths between the two.

use crate::error::{check, Error, Result};
use cudarc::driver::sys;
use std::ffi::c_void;
use tracing::{debug, warn};

/// A host memory range registered (pinned) with the driver.
pub struct HostPinnedRegion {
    host_ptr: *mut c_void,
    byte_len: usize,
    device_ptr: Option<u64>,
    registered: bool,
}

impl HostPinnedRegion {
    /// Pin `byte_len` bytes of host memory starting at `host_ptr`.
    ///
    /// # Safety
    /// `host_ptr` must point to at least `byte_len` bytes of live host
    /// memory, and that memory must outlive the region: unregistration must
    /// happen before the underlying buffer is freed (enforced here by
    /// `Drop` running before the buffer can be dropped at the call site).
    ///
    /// # Errors
    /// Returns [`Error::Pinning`] if the range is already pinned or the
    /// runtime rejects it
    pub unsafe fn register(host_ptr: *mut c_void, byte_len: usize) -> Result<Self> {
        check(
            sys::cuMemHostRegister_v2(host_ptr, byte_len, 0),
            "cuMemHostRegister",
        )
        .map_err(Error::Pinning)?;

        debug!("pinned {} bytes at {:p}", byte_len, host_ptr);

        Ok(Self {
            host_ptr,
            byte_len,
            device_ptr: None,
            registered: true,
        })
    }

    /// Host base address of the pinned range
    #[inline]
    pub fn host_address(&self) -> *mut c_void {
        self.host_ptr
    }

    /// Byte length of the pinned range
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Resolve (and cache) the device-visible address of the pinned range.
    ///
    /// # Errors
    /// Returns [`Error::Mapping`] if the driver cannot resolve the mapping
    pub fn device_address(&mut self) -> Result<u64> {
        if let Some(dptr) = self.device_ptr {
            return Ok(dptr);
        }

        let mut dptr: sys::CUdeviceptr = 0;
        check(
            unsafe { sys::cuMemHostGetDevicePointer_v2(&mut dptr, self.host_ptr, 0) },
            "cuMemHostGetDevicePointer",
        )
        .map_err(Error::Mapping)?;

        self.device_ptr = Some(dptr);
        Ok(dptr)
    }

    /// Unpin the range. Idempotent; called explicitly on the success path
    /// so an unregistration failure is reported rather than swallowed.
    pub fn unregister(&mut self) -> Result<()> {
        if !self.registered {
            return Ok(());
        }
        self.registered = false;
        self.device_ptr = None;

        check(
            unsafe { sys::cuMemHostUnregister(self.host_ptr) },
            "cuMemHostUnregister",
        )
        .map_err(Error::Pinning)?;

        debug!("unpinned {} bytes at {:p}", self.byte_len, self.host_ptr);
        Ok(())
    }
}

impl Drop for HostPinnedRegion {
    fn drop(&mut self) {
        if self.registered {
            self.registered = false;
            let status = unsafe { sys::cuMemHostUnregister(self.host_ptr) };
            if let Err(e) = check(status, "cuMemHostUnregister") {
                warn!("failed to unpin host memory at {:p}: {}", self.host_ptr, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpuContext;

    #[test]
    fn test_register_resolve_unregister() {
        if let Ok(ctx) = GpuContext::new() {
            ctx.bind_to_thread().unwrap();
            let mut host = vec![0.0f32; 1024];
            let bytes = host.len() * std::mem::size_of::<f32>();

            let mut region =
                unsafe { HostPinnedRegion::register(host.as_mut_ptr().cast(), bytes) }.unwrap();
            assert_eq!(region.byte_len(), bytes);

            let dptr = region.device_address().unwrap();
            assert_ne!(dptr, 0);
            // Cached resolution must be stable.
            assert_eq!(region.device_address().unwrap(), dptr);

            region.unregister().unwrap();
            // Idempotent after explicit unregistration.
            assert!(region.unregister().is_ok());
        }
    }

    #[test]
    fn test_drop_unpins_on_abandoned_region() {
        if let Ok(ctx) = GpuContext::new() {
            ctx.bind_to_thread().unwrap();
            let mut host = vec![0u8; 4096];

            {
                let _region =
                    unsafe { HostPinnedRegion::register(host.as_mut_ptr().cast(), host.len()) }
                        .unwrap();
                // Dropped without explicit unregistration.
            }

            // If the drop above leaked the registration, a second pin of the
            // same range would fail with HOST_MEMORY_ALREADY_REGISTERED.
            let mut region =
                unsafe { HostPinnedRegion::register(host.as_mut_ptr().cast(), host.len()) }
                    .unwrap();
            region.unregister().unwrap();
        }
    }
}
