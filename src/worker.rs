//! Per-kernel benchmark pass
//!
//! A [`BenchmarkWorker`] drives one complete pass for a single kernel on its
//! own execution queue: the device-resident phase (explicit device buffers
//! and copies) followed by the host-resident phase (pinned host memory
//! mapped into the device address space, no explicit copies).

use crate::buffer::DeviceBuffer;
use crate::clock::Clock;
use crate::config::HarnessConfig;
use crate::kernel::{dispatch_geometry, KernelHandle};
use crate::pinned::HostPinnedRegion;
use crate::runner::{ArgumentVector, KernelRunner, LaunchTiming};
use crate::{GpuContext, Result};
use cudarc::driver::CudaStream;
use std::sync::Arc;
use tracing::{debug, info};

/// Correctness verdict for one benchmark phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every index matched the host reference
    Pass,
    /// First mismatching index
    Fail {
        /// Index of the first mismatch
        index: usize,
    },
}

impl Verdict {
    /// Whether the phase passed
    #[inline]
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// Compare device-produced output against the host reference.
///
/// Short-circuits on the first mismatch, favoring fast failure over a full
/// mismatch count.
pub fn verify_elementwise_add(out: &[f32], lhs: &[f32], rhs: &[f32]) -> Verdict {
    for i in 0..out.len() {
        if out[i] != lhs[i] + rhs[i] {
            return Verdict::Fail { index: i };
        }
    }
    Verdict::Pass
}

/// Measurements and verdict for one residency phase
#[derive(Debug, Clone, Copy)]
pub struct PhaseReport {
    /// Pipelined (throughput-mode) measurement
    pub pipelined: LaunchTiming,
    /// Synchronous (latency-mode) measurement
    pub synchronous: LaunchTiming,
    /// Correctness verdict; `None` for a timing-only worker
    pub verdict: Option<Verdict>,
    /// Total setup + run + verify time for the phase, microseconds
    pub phase_elapsed_us: u64,
}

impl PhaseReport {
    /// Whether the phase passed (vacuously true without validation)
    pub fn passed(&self) -> bool {
        self.verdict.map_or(true, |v| v.passed())
    }
}

/// Full report for one kernel's benchmark pass
#[derive(Debug, Clone)]
pub struct WorkerReport {
    /// Resolved kernel entry name
    pub kernel: String,
    /// Device-resident phase results
    pub device_resident: PhaseReport,
    /// Host-resident (pinned/mapped) phase results
    pub host_resident: PhaseReport,
}

impl WorkerReport {
    /// Whether every validated phase passed
    pub fn passed(&self) -> bool {
        self.device_resident.passed() && self.host_resident.passed()
    }
}

/// Runs one full benchmark pass for one kernel on one execution queue.
pub struct BenchmarkWorker {
    ctx: GpuContext,
    runner: KernelRunner,
    kernel: KernelHandle,
    config: HarnessConfig,
    validate: bool,
}

impl BenchmarkWorker {
    /// Create a worker bound to its own execution queue.
    ///
    /// `validate` enables the correctness check; the no-op kernel produces
    /// no meaningful output to validate and runs timing-only.
    pub fn new(
        ctx: GpuContext,
        queue: Arc<CudaStream>,
        kernel: KernelHandle,
        config: HarnessConfig,
        validate: bool,
    ) -> Self {
        Self {
            ctx,
            runner: KernelRunner::new(queue),
            kernel,
            config,
            validate,
        }
    }

    /// Run both residency phases and report.
    ///
    /// Runtime errors propagate; already-acquired buffers and pinned regions
    /// are released on every exit path by their owning types.
    pub fn run(self) -> Result<WorkerReport> {
        self.ctx.bind_to_thread()?;

        let n = self.config.element_count;
        let mut host_a = vec![0.0f32; n];
        let mut host_b = vec![0.0f32; n];
        let mut host_c = vec![0.0f32; n];
        for i in 0..n {
            host_b[i] = i as f32;
            host_c[i] = (i * 2) as f32;
        }

        let device_resident = self.device_phase(&mut host_a, &host_b, &host_c)?;

        // A stale device-phase result must not satisfy the host-phase check.
        host_a.fill(0.0);

        let host_resident = self.host_phase(&mut host_a, &mut host_b, &mut host_c)?;

        Ok(WorkerReport {
            kernel: self.kernel.name().to_string(),
            device_resident,
            host_resident,
        })
    }

    fn geometry(&self) -> cudarc::driver::LaunchConfig {
        dispatch_geometry(
            self.kernel.name(),
            &self.config.noop_entry,
            self.config.element_count,
            self.config.threads_per_block,
        )
    }

    /// Phase A: data staged in device-allocated memory with explicit copies.
    fn device_phase(
        &self,
        host_a: &mut [f32],
        host_b: &[f32],
        host_c: &[f32],
    ) -> Result<PhaseReport> {
        info!(
            "run {} x{} using device resident memory",
            self.kernel.name(),
            self.config.iterations
        );
        let clock = Clock::start();

        let n = self.config.element_count;
        let dev_a = DeviceBuffer::<f32>::new(n)?;
        let mut dev_b = DeviceBuffer::<f32>::new(n)?;
        let mut dev_c = DeviceBuffer::<f32>::new(n)?;

        dev_b.copy_from_host(host_b)?;
        dev_c.copy_from_host(host_c)?;

        let args = ArgumentVector {
            out: dev_a.address(),
            lhs: dev_b.address(),
            rhs: dev_c.address(),
        };
        debug!(
            "device buffers: {:#x}, {:#x}, {:#x}",
            args.out, args.lhs, args.rhs
        );

        let geometry = self.geometry();
        let pipelined =
            self.runner
                .run_throughput(&self.kernel, &args, geometry, self.config.iterations)?;
        let synchronous =
            self.runner
                .run_latency(&self.kernel, &args, geometry, self.config.iterations)?;

        dev_a.copy_to_host_into(host_a)?;

        let verdict = self.validate.then(|| {
            let v = verify_elementwise_add(host_a, host_b, host_c);
            report_verdict(self.kernel.name(), "device resident", v);
            v
        });

        Ok(PhaseReport {
            pipelined,
            synchronous,
            verdict,
            phase_elapsed_us: clock.elapsed_micros(),
        })
    }

    /// Phase B: host memory pinned and mapped into the device address
    /// space; the kernel reads and writes host memory directly.
    fn host_phase(
        &self,
        host_a: &mut [f32],
        host_b: &mut [f32],
        host_c: &mut [f32],
    ) -> Result<PhaseReport> {
        info!(
            "run {} x{} using host resident memory",
            self.kernel.name(),
            self.config.iterations
        );
        let clock = Clock::start();
        let bytes = self.config.buffer_bytes();

        // Registered A, B, C in that order; locals drop in reverse
        // declaration order, so an error below still unpins C, B, A.
        let mut reg_a = unsafe { HostPinnedRegion::register(host_a.as_mut_ptr().cast(), bytes) }?;
        let mut reg_b = unsafe { HostPinnedRegion::register(host_b.as_mut_ptr().cast(), bytes) }?;
        let mut reg_c = unsafe { HostPinnedRegion::register(host_c.as_mut_ptr().cast(), bytes) }?;

        let args = ArgumentVector {
            out: reg_a.device_address()?,
            lhs: reg_b.device_address()?,
            rhs: reg_c.device_address()?,
        };
        debug!(
            "device mapped host buffers: {:#x}, {:#x}, {:#x}",
            args.out, args.lhs, args.rhs
        );

        let geometry = self.geometry();
        let pipelined =
            self.runner
                .run_throughput(&self.kernel, &args, geometry, self.config.iterations)?;
        let synchronous =
            self.runner
                .run_latency(&self.kernel, &args, geometry, self.config.iterations)?;

        // The kernel wrote through the mapping directly into host memory;
        // the queue is already drained, so no copy back is needed.
        let verdict = self.validate.then(|| {
            let v = verify_elementwise_add(host_a, host_b, host_c);
            report_verdict(self.kernel.name(), "host resident", v);
            v
        });

        // Mirror image of registration order.
        reg_c.unregister()?;
        reg_b.unregister()?;
        reg_a.unregister()?;

        Ok(PhaseReport {
            pipelined,
            synchronous,
            verdict,
            phase_elapsed_us: clock.elapsed_micros(),
        })
    }
}

fn report_verdict(kernel: &str, phase: &str, verdict: Verdict) {
    match verdict {
        Verdict::Pass => info!("{} ({}): PASSED", kernel, phase),
        Verdict::Fail { index } => {
            info!("{} ({}): FAILED at index {}", kernel, phase, index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_all_match() {
        let lhs: Vec<f32> = (0..256).map(|i| i as f32).collect();
        let rhs: Vec<f32> = (0..256).map(|i| (i * 2) as f32).collect();
        let out: Vec<f32> = (0..256).map(|i| (i * 3) as f32).collect();
        assert_eq!(verify_elementwise_add(&out, &lhs, &rhs), Verdict::Pass);
    }

    #[test]
    fn test_verify_reports_first_mismatch() {
        let lhs = vec![1.0f32; 16];
        let rhs = vec![2.0f32; 16];
        let mut out = vec![3.0f32; 16];
        out[5] = 0.0;
        out[9] = 0.0;
        assert_eq!(
            verify_elementwise_add(&out, &lhs, &rhs),
            Verdict::Fail { index: 5 }
        );
    }

    #[test]
    fn test_verify_rejects_stale_zeroed_output() {
        // A zero-filled result buffer must fail against nonzero operands.
        let lhs: Vec<f32> = (1..17).map(|i| i as f32).collect();
        let rhs: Vec<f32> = (1..17).map(|i| i as f32).collect();
        let out = vec![0.0f32; 16];
        assert_eq!(
            verify_elementwise_add(&out, &lhs, &rhs),
            Verdict::Fail { index: 0 }
        );
    }

    #[test]
    fn test_verify_empty_passes() {
        assert_eq!(verify_elementwise_add(&[], &[], &[]), Verdict::Pass);
    }

    #[test]
    fn test_phase_report_passed() {
        let timing = LaunchTiming {
            iterations: 1,
            elapsed_us: 1,
        };
        let with_pass = PhaseReport {
            pipelined: timing,
            synchronous: timing,
            verdict: Some(Verdict::Pass),
            phase_elapsed_us: 1,
        };
        let with_fail = PhaseReport {
            verdict: Some(Verdict::Fail { index: 3 }),
            ..with_pass
        };
        let timing_only = PhaseReport {
            verdict: None,
            ..with_pass
        };

        assert!(with_pass.passed());
        assert!(!with_fail.passed());
        assert!(timing_only.passed());
    }
}
