//! Concurrent two-worker orchestration
//!
//! Runs the workload kernel and the no-op kernel concurrently, one worker
//! per kernel, each on its own execution queue and thread. The workload
//! worker validates correctness; the no-op worker runs timing-only. Both
//! workers are joined before any result is observed, and each returns a
//! typed result rather than unwinding across the thread boundary.

use crate::config::HarnessConfig;
use crate::kernel::KernelHandle;
use crate::worker::{BenchmarkWorker, WorkerReport};
use crate::{Error, GpuContext, Result};
use std::thread;
use tracing::{debug, info};

/// Combined results of one harness run
#[derive(Debug, Clone)]
pub struct BenchmarkSummary {
    /// Report for the elementwise-add kernel (validated)
    pub workload: WorkerReport,
    /// Report for the no-op kernel (timing-only)
    pub baseline: WorkerReport,
}

impl BenchmarkSummary {
    /// Whether every validated phase passed
    pub fn passed(&self) -> bool {
        self.workload.passed() && self.baseline.passed()
    }
}

/// Constructs the context, kernels, and queues, and joins the two workers.
pub struct Orchestrator {
    config: HarnessConfig,
}

impl Orchestrator {
    /// Create an orchestrator from a validated configuration
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run both benchmark workers concurrently and combine their reports.
    ///
    /// Overall failure is any worker reporting FAIL (visible through the
    /// summary) or returning an unrecovered runtime error (propagated here).
    pub fn run(&self) -> Result<BenchmarkSummary> {
        let ctx = GpuContext::with_device(self.config.device_id)?;
        ctx.log_device_info()?;

        let workload_kernel = KernelHandle::load(
            &ctx,
            &self.config.kernel_module,
            &self.config.kernel_entry,
        )?;
        let noop_kernel =
            KernelHandle::load(&ctx, &self.config.noop_module, &self.config.noop_entry)?;

        // One independent queue per worker; never shared.
        let workload_queue = ctx.new_queue()?;
        let noop_queue = ctx.new_queue()?;

        let workload_worker = BenchmarkWorker::new(
            ctx.clone(),
            workload_queue,
            workload_kernel,
            self.config.clone(),
            true,
        );
        let noop_worker = BenchmarkWorker::new(
            ctx.clone(),
            noop_queue,
            noop_kernel,
            self.config.clone(),
            false,
        );

        debug!("spawning benchmark workers");
        let workload_handle = thread::spawn(move || workload_worker.run());
        let noop_handle = thread::spawn(move || noop_worker.run());

        // Both handles are joined before either result is inspected: a
        // failing workload worker must not leave the no-op worker detached
        // and still issuing driver calls while the process exits.
        let workload = join_worker(workload_handle, &self.config.kernel_entry);
        let baseline = join_worker(noop_handle, &self.config.noop_entry);
        let workload = workload?;
        let baseline = baseline?;

        let summary = BenchmarkSummary { workload, baseline };
        info!(
            "harness complete: {}",
            if summary.passed() { "PASSED" } else { "FAILED" }
        );
        Ok(summary)
    }
}

/// Block until one worker thread completes, lifting a panic into
/// [`Error::WorkerPanic`].
fn join_worker(
    handle: thread::JoinHandle<Result<WorkerReport>>,
    kernel: &str,
) -> Result<WorkerReport> {
    handle
        .join()
        .map_err(|_| Error::WorkerPanic(kernel.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::LaunchTiming;
    use crate::worker::PhaseReport;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn dummy_report(kernel: &str) -> WorkerReport {
        let timing = LaunchTiming {
            iterations: 1,
            elapsed_us: 1,
        };
        let phase = PhaseReport {
            pipelined: timing,
            synchronous: timing,
            verdict: None,
            phase_elapsed_us: 1,
        };
        WorkerReport {
            kernel: kernel.to_string(),
            device_resident: phase,
            host_resident: phase,
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = HarnessConfig::new().with_iterations(0);
        assert!(Orchestrator::new(config).is_err());
    }

    #[test]
    fn test_accepts_default_config() {
        assert!(Orchestrator::new(HarnessConfig::default()).is_ok());
    }

    #[test]
    fn test_join_worker_lifts_panic() {
        let handle = thread::spawn(|| -> Result<WorkerReport> { panic!("boom") });
        let err = join_worker(handle, "vectoradd").expect_err("must fail");
        assert!(matches!(err, Error::WorkerPanic(name) if name == "vectoradd"));
    }

    #[test]
    fn test_join_worker_passes_through_results() {
        let handle = thread::spawn(|| Ok(dummy_report("mynop")));
        let report = join_worker(handle, "mynop").unwrap();
        assert_eq!(report.kernel, "mynop");
    }

    #[test]
    fn test_failing_worker_does_not_leave_peer_detached() {
        // Mirrors the join sequence in Orchestrator::run: one worker errors
        // immediately, the other is still running. The slow worker must be
        // joined (and its completion observed) before either result is
        // propagated.
        let peer_completed = Arc::new(AtomicBool::new(false));
        let flag = peer_completed.clone();

        let failing = thread::spawn(|| -> Result<WorkerReport> {
            Err(Error::InvalidConfig("injected worker failure".to_string()))
        });
        let slow = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
            Ok(dummy_report("mynop"))
        });

        let workload = join_worker(failing, "vectoradd");
        let baseline = join_worker(slow, "mynop");

        assert!(peer_completed.load(Ordering::SeqCst));
        assert!(workload.is_err());
        assert!(baseline.is_ok());
    }
}
