//! Harness configuration
//!
//! All workload parameters live in one explicit structure passed into the
//! orchestrator: the fixed element count, dispatch width, iteration count,
//! and the module/entry names for the two kernels under comparison.

use crate::{Error, Result};
use std::path::PathBuf;

/// Configuration for one harness run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Number of f32 elements per buffer (default: 2^20)
    pub element_count: usize,

    /// Threads per block along x for the workload kernel (default: 32)
    pub threads_per_block: u32,

    /// Kernel launches per timing mode per phase (default: 1000)
    pub iterations: u32,

    /// Module file containing the elementwise-add kernel
    pub kernel_module: PathBuf,

    /// Entry point name of the elementwise-add kernel
    pub kernel_entry: String,

    /// Module file containing the no-op kernel
    pub noop_module: PathBuf,

    /// Entry point name of the no-op kernel
    pub noop_entry: String,

    /// CUDA device ordinal (0-based)
    pub device_id: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            element_count: 1 << 20,
            threads_per_block: 32,
            iterations: 1000,
            kernel_module: PathBuf::from("vectoradd.ptx"),
            kernel_entry: "vectoradd".to_string(),
            noop_module: PathBuf::from("nop.ptx"),
            noop_entry: "mynop".to_string(),
            device_id: 0,
        }
    }
}

impl HarnessConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the element count
    pub fn with_element_count(mut self, count: usize) -> Self {
        self.element_count = count;
        self
    }

    /// Set threads per block
    pub fn with_threads_per_block(mut self, threads: u32) -> Self {
        self.threads_per_block = threads;
        self
    }

    /// Set the iteration count
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the device ordinal
    pub fn with_device_id(mut self, device_id: usize) -> Self {
        self.device_id = device_id;
        self
    }

    /// Total byte length of one f32 buffer
    #[inline]
    pub fn buffer_bytes(&self) -> usize {
        self.element_count * std::mem::size_of::<f32>()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.element_count == 0 {
            return Err(Error::InvalidConfig(
                "element_count must be > 0".to_string(),
            ));
        }

        if self.threads_per_block == 0 {
            return Err(Error::InvalidConfig(
                "threads_per_block must be > 0".to_string(),
            ));
        }

        if self.element_count > u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "element_count {} exceeds the maximum dispatchable count {}",
                self.element_count,
                u32::MAX
            )));
        }

        if self.element_count % self.threads_per_block as usize != 0 {
            return Err(Error::InvalidConfig(format!(
                "element_count {} must be a multiple of threads_per_block {}",
                self.element_count, self.threads_per_block
            )));
        }

        if self.iterations == 0 {
            return Err(Error::InvalidConfig("iterations must be > 0".to_string()));
        }

        if self.kernel_entry == self.noop_entry {
            return Err(Error::InvalidConfig(
                "kernel_entry and noop_entry must differ".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.element_count, 1 << 20);
        assert_eq!(config.threads_per_block, 32);
        assert_eq!(config.iterations, 1000);
        assert_eq!(config.kernel_entry, "vectoradd");
        assert_eq!(config.noop_entry, "mynop");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_buffer_bytes() {
        let config = HarnessConfig::new().with_element_count(1 << 20);
        assert_eq!(config.buffer_bytes(), (1 << 20) * 4);
    }

    #[test]
    fn test_builder_pattern() {
        let config = HarnessConfig::new()
            .with_element_count(4096)
            .with_threads_per_block(64)
            .with_iterations(100);

        assert_eq!(config.element_count, 4096);
        assert_eq!(config.threads_per_block, 64);
        assert_eq!(config.iterations, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_elements() {
        let config = HarnessConfig::new().with_element_count(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_iterations() {
        let config = HarnessConfig::new().with_iterations(0);
        assert!(config.validate().is_err());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_validation_oversized_element_count() {
        // 2^32 is a multiple of any power-of-two block width but cannot be
        // expressed as a 32-bit grid dimension.
        let config = HarnessConfig::new().with_element_count(1usize << 32);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_misaligned_element_count() {
        let config = HarnessConfig::new()
            .with_element_count(1000)
            .with_threads_per_block(32);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_duplicate_entry_names() {
        let mut config = HarnessConfig::new();
        config.noop_entry = config.kernel_entry.clone();
        assert!(config.validate().is_err());
    }
}
