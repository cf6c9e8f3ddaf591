//! Device memory ownership
//!
//! [`DeviceBuffer`] owns one contiguous device allocation for its lifetime
//! and exposes its stable device address for use as a kernel argument. The
//! raw driver allocator is used (rather than stream-ordered slices) because
//! the harness binds raw device addresses into an argument vector that is
//! reused across thousands of launches.

use crate::error::{DriverStatus, Error, Result};
use cudarc::driver::{result, sys, DeviceRepr};
use std::marker::PhantomData;
use tracing::error;

/// One contiguous region of device memory, parameterized by element type.
///
/// Exactly one owner per allocation: no `Clone`, moves transfer ownership,
/// and the allocation is released exactly once on drop.
pub struct DeviceBuffer<T> {
    dptr: sys::CUdeviceptr,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: DeviceRepr> DeviceBuffer<T> {
    /// Allocate `len` elements of device memory
    ///
    /// # Errors
    /// Returns [`Error::Allocation`] if the runtime allocation fails
    pub fn new(len: usize) -> Result<Self> {
        let bytes = len * std::mem::size_of::<T>();
        let dptr = unsafe { result::malloc_sync(bytes) }
            .map_err(|e| Error::Allocation(DriverStatus::from_driver(e, "cuMemAlloc")))?;

        Ok(Self {
            dptr,
            len,
            _marker: PhantomData,
        })
    }

    /// Device-visible base address, stable for the buffer's lifetime
    #[inline]
    pub fn address(&self) -> u64 {
        self.dptr
    }

    /// Buffer length in elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds zero elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy host data into this buffer
    ///
    /// # Errors
    /// Returns an error if the lengths differ or the transfer fails
    pub fn copy_from_host(&mut self, src: &[T]) -> Result<()> {
        if src.len() != self.len {
            return Err(Error::InvalidConfig(format!(
                "source length {} does not match buffer length {}",
                src.len(),
                self.len
            )));
        }

        unsafe { result::memcpy_htod_sync(self.dptr, src) }
            .map_err(|e| Error::Runtime(DriverStatus::from_driver(e, "cuMemcpyHtoD")))
    }

    /// Copy this buffer into a pre-allocated host slice
    pub fn copy_to_host_into(&self, dst: &mut [T]) -> Result<()> {
        if dst.len() != self.len {
            return Err(Error::InvalidConfig(format!(
                "destination length {} does not match buffer length {}",
                dst.len(),
                self.len
            )));
        }

        unsafe { result::memcpy_dtoh_sync(dst, self.dptr) }
            .map_err(|e| Error::Runtime(DriverStatus::from_driver(e, "cuMemcpyDtoH")))
    }
}

impl<T> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        if let Err(e) = unsafe { result::free_sync(self.dptr) } {
            // A failing free signals an unrecoverable fault in the device
            // context; continuing would run later phases against it.
            if std::thread::panicking() {
                error!("leaking device buffer, cuMemFree failed during unwind: {:?}", e);
            } else {
                panic!("cuMemFree failed: {:?}", e);
            }
        }
    }
}
