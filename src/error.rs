//! Error types for the benchmark harness
//!
//! Every accelerator-runtime call in this crate is checked through this
//! module: raw `CUresult` codes via [`check`], safe-API `DriverError`s via
//! [`DriverStatus::from_driver`]. Nothing silently ignores a failing status.

use cudarc::driver::{sys, DriverError};

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Detail captured from a failing driver call.
///
/// Carries the numeric status code, the driver's symbolic name and
/// description, and the context string supplied by the call site.
/// `DriverError` doesn't implement Display in cudarc 0.18, so the symbolic
/// name and description are taken from its Debug representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverStatus {
    /// Numeric CUresult code
    pub code: u32,
    /// Symbolic error name and descriptive message from the driver
    pub detail: String,
    /// Caller-supplied context (which operation was attempted)
    pub context: String,
}

impl DriverStatus {
    /// Capture a failing safe-API call
    pub fn from_driver(err: DriverError, context: impl Into<String>) -> Self {
        Self {
            code: err.0 as u32,
            detail: format!("{:?}", err),
            context: context.into(),
        }
    }
}

impl std::fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} (code {})", self.context, self.detail, self.code)
    }
}

/// Benchmark harness errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Device memory allocation failed
    #[error("device memory allocation failed: {0}")]
    Allocation(DriverStatus),

    /// Host memory could not be pinned (or unpinned)
    #[error("host memory pinning failed: {0}")]
    Pinning(DriverStatus),

    /// Device-visible address of a pinned range could not be resolved
    #[error("device address mapping failed: {0}")]
    Mapping(DriverStatus),

    /// Kernel dispatch rejected by the runtime
    #[error("kernel launch failed: {0}")]
    Launch(DriverStatus),

    /// Wait-for-completion failed, typically an earlier asynchronous fault
    #[error("device synchronization failed: {0}")]
    Synchronization(DriverStatus),

    /// Driver failure outside the classes above (context creation,
    /// module load, memory copy)
    #[error("accelerator runtime error: {0}")]
    Runtime(DriverStatus),

    /// Kernel module file could not be read
    #[error("failed to read kernel module {path}: {source}")]
    ModuleIo {
        /// Module file path
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration rejected by validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A benchmark worker thread terminated abnormally
    #[error("benchmark worker for kernel '{0}' panicked")]
    WorkerPanic(String),
}

/// Check a raw driver status code, attaching context on failure.
///
/// This is the single error-signaling path for raw `sys` calls; call sites
/// lift the returned [`DriverStatus`] into the taxonomy variant for their
/// operation class.
pub(crate) fn check(
    status: sys::CUresult,
    context: &'static str,
) -> std::result::Result<(), DriverStatus> {
    status
        .result()
        .map_err(|e| DriverStatus::from_driver(e, context))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(context: &str) -> DriverStatus {
        DriverStatus {
            code: 2,
            detail: "DriverError(CUDA_ERROR_OUT_OF_MEMORY, \"out of memory\")".to_string(),
            context: context.to_string(),
        }
    }

    #[test]
    fn test_driver_status_display() {
        let s = status("cuMemAlloc");
        let text = s.to_string();
        assert!(text.contains("cuMemAlloc"));
        assert!(text.contains("CUDA_ERROR_OUT_OF_MEMORY"));
        assert!(text.contains("code 2"));
    }

    #[test]
    fn test_error_variants_carry_context() {
        let err = Error::Allocation(status("buffer A"));
        assert!(err.to_string().contains("allocation failed"));
        assert!(err.to_string().contains("buffer A"));

        let err = Error::Launch(status("vectoradd"));
        assert!(err.to_string().contains("launch failed"));
        assert!(err.to_string().contains("vectoradd"));
    }

    #[test]
    fn test_check_success_is_ok() {
        assert!(check(sys::CUresult::CUDA_SUCCESS, "noop").is_ok());
    }

    #[test]
    fn test_check_failure_captures_context() {
        let err = check(sys::CUresult::CUDA_ERROR_INVALID_VALUE, "cuMemHostRegister")
            .expect_err("must fail");
        assert_eq!(err.context, "cuMemHostRegister");
        assert!(err.detail.contains("CUDA_ERROR_INVALID_VALUE"));
    }
}
