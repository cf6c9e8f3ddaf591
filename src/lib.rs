//! GPU kernel-launch microbenchmark harness
//!
//! Measures accelerator kernel-launch performance under two memory-residency
//! models and isolates fixed launch overhead from work-induced latency by
//! comparing a data-moving elementwise-add kernel against a no-op kernel.
//!
//! # Architecture
//!
//! - [`DeviceBuffer`] / [`HostPinnedRegion`]: scoped ownership of device
//!   allocations and pinned host ranges, released on every exit path
//! - [`KernelRunner`]: pipelined-throughput and synchronous-latency timing
//!   over a fixed argument vector
//! - [`BenchmarkWorker`]: one full pass per kernel — device-resident phase
//!   (explicit copies), then host-resident phase (pinned, device-mapped
//!   host memory), each with a correctness verdict
//! - [`Orchestrator`]: the two workers run concurrently on independent
//!   execution queues and are joined before results are observed
//!
//! # Example
//!
//! ```no_run
//! use launchbench::{HarnessConfig, Orchestrator};
//!
//! # fn main() -> launchbench::Result<()> {
//! let config = HarnessConfig::new().with_iterations(1000);
//! let summary = Orchestrator::new(config)?.run()?;
//! assert!(summary.passed());
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod kernel;
pub mod orchestrator;
pub mod pinned;
pub mod runner;
pub mod worker;

pub use buffer::DeviceBuffer;
pub use clock::Clock;
pub use config::HarnessConfig;
pub use context::GpuContext;
pub use error::{DriverStatus, Error, Result};
pub use kernel::{dispatch_geometry, KernelHandle};
pub use orchestrator::{BenchmarkSummary, Orchestrator};
pub use pinned::HostPinnedRegion;
pub use runner::{ArgumentVector, KernelRunner, LaunchTiming};
pub use worker::{BenchmarkWorker, PhaseReport, Verdict, WorkerReport};
