//! Kernel execution and timing
//!
//! Two measurement modes over the same dispatch geometry:
//!
//! - **throughput**: all launches submitted back-to-back, one blocking wait
//!   at the end. Measures sustained launch throughput under queue
//!   pipelining; the implied per-launch latency is optimistic because
//!   submissions overlap.
//! - **latency**: one blocking wait after every launch. Measures true
//!   start-to-finish latency, free of pipelining effects.
//!
//! Reporting only one of the two numbers would conflate "how fast can
//! launches be queued" with "how long does one launch take end-to-end".

use crate::clock::Clock;
use crate::error::{DriverStatus, Error, Result};
use crate::kernel::KernelHandle;
use cudarc::driver::{CudaStream, LaunchConfig, PushKernelArg};
use std::sync::Arc;
use tracing::info;

/// The three device-visible addresses bound as kernel arguments: the result
/// buffer and the two operands. Bound once per residency phase and reused
/// across all iterations of that phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentVector {
    /// Result buffer (A)
    pub out: u64,
    /// First operand (B)
    pub lhs: u64,
    /// Second operand (C)
    pub rhs: u64,
}

/// Measured wall-clock interval over a known launch count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchTiming {
    /// Number of launches measured
    pub iterations: u32,
    /// Total elapsed wall-clock time in microseconds
    pub elapsed_us: u64,
}

impl LaunchTiming {
    /// Completed launches per second
    pub fn ops_per_sec(&self) -> f64 {
        self.iterations as f64 * 1_000_000.0 / self.elapsed_us.max(1) as f64
    }

    /// Mean time per launch in microseconds
    pub fn mean_latency_us(&self) -> f64 {
        self.elapsed_us as f64 / self.iterations as f64
    }
}

impl std::fmt::Display for LaunchTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({} loops, {} us, {:.0} ops/s, {:.2} us mean latency)",
            self.iterations,
            self.elapsed_us,
            self.ops_per_sec(),
            self.mean_latency_us()
        )
    }
}

/// Executes a kernel N times against a fixed argument list on one execution
/// queue, measuring pipelined throughput or per-iteration latency.
pub struct KernelRunner {
    queue: Arc<CudaStream>,
}

impl KernelRunner {
    /// Create a runner bound to one execution queue
    pub fn new(queue: Arc<CudaStream>) -> Self {
        Self { queue }
    }

    fn launch(
        &self,
        kernel: &KernelHandle,
        args: &ArgumentVector,
        geometry: LaunchConfig,
    ) -> Result<()> {
        unsafe {
            let mut launch = self.queue.launch_builder(kernel.function());
            launch.arg(&args.out).arg(&args.lhs).arg(&args.rhs);
            launch
                .launch(geometry)
                .map_err(|e| Error::Launch(DriverStatus::from_driver(e, kernel.name())))?;
        }
        Ok(())
    }

    fn drain(&self, kernel: &KernelHandle) -> Result<()> {
        self.queue.synchronize().map_err(|e| {
            Error::Synchronization(DriverStatus::from_driver(
                e,
                format!("cuStreamSynchronize ({})", kernel.name()),
            ))
        })
    }

    /// Submit `iterations` launches back-to-back, then wait once for the
    /// queue to drain. A launch failure aborts the remaining iterations.
    pub fn run_throughput(
        &self,
        kernel: &KernelHandle,
        args: &ArgumentVector,
        geometry: LaunchConfig,
        iterations: u32,
    ) -> Result<LaunchTiming> {
        info!("running {} {} times (pipelined)...", kernel.name(), iterations);

        let clock = Clock::start();
        for _ in 0..iterations {
            self.launch(kernel, args, geometry)?;
        }
        self.drain(kernel)?;

        let timing = LaunchTiming {
            iterations,
            elapsed_us: clock.elapsed_micros(),
        };
        info!("throughput {}", timing);
        Ok(timing)
    }

    /// Submit one launch and block for completion before the next,
    /// `iterations` times.
    pub fn run_latency(
        &self,
        kernel: &KernelHandle,
        args: &ArgumentVector,
        geometry: LaunchConfig,
        iterations: u32,
    ) -> Result<LaunchTiming> {
        info!("running {} {} times (synchronous)...", kernel.name(), iterations);

        let clock = Clock::start();
        for _ in 0..iterations {
            self.launch(kernel, args, geometry)?;
            self.drain(kernel)?;
        }

        let timing = LaunchTiming {
            iterations,
            elapsed_us: clock.elapsed_micros(),
        };
        info!("latency {}", timing);
        Ok(timing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throughput_arithmetic() {
        let timing = LaunchTiming {
            iterations: 1000,
            elapsed_us: 2_000_000,
        };
        // K / E in seconds
        assert!((timing.ops_per_sec() - 500.0).abs() < f64::EPSILON);
        // E / K
        assert!((timing.mean_latency_us() - 2000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_throughput_and_latency_are_reciprocal() {
        let timing = LaunchTiming {
            iterations: 5000,
            elapsed_us: 123_456,
        };
        let product = timing.ops_per_sec() * timing.mean_latency_us() / 1_000_000.0;
        assert!((product - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_elapsed_does_not_divide_by_zero() {
        let timing = LaunchTiming {
            iterations: 10,
            elapsed_us: 0,
        };
        assert!(timing.ops_per_sec().is_finite());
    }

    #[test]
    fn test_timing_display_format() {
        let timing = LaunchTiming {
            iterations: 1000,
            elapsed_us: 4000,
        };
        let text = timing.to_string();
        assert!(text.contains("1000 loops"));
        assert!(text.contains("4000 us"));
        assert!(text.contains("250000 ops/s"));
    }
}
