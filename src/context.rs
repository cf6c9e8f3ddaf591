//! Device context management
//!
//! Encapsulates the CUDA context and provides the device property report
//! printed at startup. The context is shared between both benchmark workers;
//! each worker binds it to its own thread before issuing driver calls.

use crate::error::{DriverStatus, Error, Result};
use cudarc::driver::{sys, CudaContext, CudaStream};
use std::sync::Arc;
use tracing::{debug, info};

/// Device context for the benchmark harness
#[derive(Clone)]
pub struct GpuContext {
    ctx: Arc<CudaContext>,
}

impl GpuContext {
    /// Create a context on the default device (ordinal 0)
    ///
    /// # Errors
    /// Returns an error if no CUDA-capable device is available or
    /// initialization fails
    pub fn new() -> Result<Self> {
        Self::with_device(0)
    }

    /// Create a context on a specific device ordinal
    pub fn with_device(device_id: usize) -> Result<Self> {
        debug!("initializing CUDA device {}", device_id);

        let ctx = CudaContext::new(device_id).map_err(|e| {
            Error::Runtime(DriverStatus::from_driver(
                e,
                format!("cuCtxCreate (device {})", device_id),
            ))
        })?;

        Ok(Self { ctx })
    }

    /// The underlying CUDA context
    #[inline]
    pub fn context(&self) -> &Arc<CudaContext> {
        &self.ctx
    }

    /// Create an independent execution queue.
    ///
    /// Work submitted to one queue executes in submission order; queues are
    /// unordered relative to each other. Each benchmark worker owns exactly
    /// one queue.
    pub fn new_queue(&self) -> Result<Arc<CudaStream>> {
        self.ctx
            .new_stream()
            .map_err(|e| Error::Runtime(DriverStatus::from_driver(e, "cuStreamCreate")))
    }

    /// Bind this context to the calling thread.
    ///
    /// Must be called once by each worker thread before any driver call.
    pub fn bind_to_thread(&self) -> Result<()> {
        self.ctx
            .bind_to_thread()
            .map_err(|e| Error::Runtime(DriverStatus::from_driver(e, "cuCtxSetCurrent")))
    }

    /// Device name
    pub fn device_name(&self) -> Result<String> {
        self.ctx
            .name()
            .map_err(|e| Error::Runtime(DriverStatus::from_driver(e, "cuDeviceGetName")))
    }

    /// Query a device attribute
    fn attribute(&self, attr: sys::CUdevice_attribute) -> Result<i32> {
        self.ctx
            .attribute(attr)
            .map_err(|e| Error::Runtime(DriverStatus::from_driver(e, "cuDeviceGetAttribute")))
    }

    /// Log the device property report
    pub fn log_device_info(&self) -> Result<()> {
        let name = self.device_name()?;
        let (cc_major, cc_minor) = self
            .ctx
            .compute_capability()
            .map_err(|e| Error::Runtime(DriverStatus::from_driver(e, "cuDeviceComputeCapability")))?;
        let sm_count = self.attribute(
            sys::CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MULTIPROCESSOR_COUNT,
        )?;
        let max_threads = self.attribute(
            sys::CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_THREADS_PER_BLOCK,
        )?;

        info!(
            "device: {} (sm_{}{}, {} multiprocessors, {} max threads/block)",
            name, cc_major, cc_minor, sm_count, max_threads
        );
        Ok(())
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("device_name", &self.device_name().ok())
            .finish()
    }
}
