//! Kernel module loading and dispatch geometry

use crate::error::{DriverStatus, Error, Result};
use crate::GpuContext;
use cudarc::driver::{CudaFunction, CudaModule, LaunchConfig};
use cudarc::nvrtc::Ptx;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A resolved kernel function plus its human-readable entry name.
///
/// The name is used to branch benchmark parameters (the no-op kernel gets a
/// degenerate dispatch). Immutable once resolved.
pub struct KernelHandle {
    name: String,
    function: CudaFunction,
    /// Keeps the function's module alive for the handle's lifetime
    #[allow(dead_code)]
    module: Arc<CudaModule>,
}

impl KernelHandle {
    /// Load a precompiled module image from disk and resolve one entry point.
    ///
    /// Accepts anything `cuModuleLoadData` accepts: PTX text, cubin, fatbin.
    pub fn load(ctx: &GpuContext, path: &Path, entry: &str) -> Result<Self> {
        debug!("loading kernel module {} (entry {})", path.display(), entry);

        let mut image = std::fs::read(path).map_err(|source| Error::ModuleIo {
            path: path.display().to_string(),
            source,
        })?;
        // cuModuleLoadData expects NUL-terminated text images; harmless for cubin.
        image.push(0);

        let module = ctx
            .context()
            .load_module(Ptx::from_binary(image))
            .map_err(|e| {
                Error::Runtime(DriverStatus::from_driver(
                    e,
                    format!("cuModuleLoadData ({})", path.display()),
                ))
            })?;

        let function = module.load_function(entry).map_err(|e| {
            Error::Runtime(DriverStatus::from_driver(
                e,
                format!("cuModuleGetFunction ({})", entry),
            ))
        })?;

        Ok(Self {
            name: entry.to_string(),
            function,
            module,
        })
    }

    /// Resolved entry point name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying function handle
    #[inline]
    pub fn function(&self) -> &CudaFunction {
        &self.function
    }
}

impl std::fmt::Debug for KernelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelHandle").field("name", &self.name).finish()
    }
}

/// Dispatch geometry for one kernel launch.
///
/// The kernel identified by `noop_entry` performs no per-element work and is
/// dispatched as a single block of a single thread to measure fixed launch
/// overhead; every other kernel covers `element_count` elements with 1-D
/// blocks of `threads_per_block` threads.
pub fn dispatch_geometry(
    kernel_name: &str,
    noop_entry: &str,
    element_count: usize,
    threads_per_block: u32,
) -> LaunchConfig {
    if kernel_name == noop_entry {
        LaunchConfig {
            grid_dim: (1, 1, 1),
            block_dim: (1, 1, 1),
            shared_mem_bytes: 0,
        }
    } else {
        LaunchConfig {
            grid_dim: (element_count as u32 / threads_per_block, 1, 1),
            block_dim: (threads_per_block, 1, 1),
            shared_mem_bytes: 0,
        }
    }
}
