//! Execution context: which backend runs the elementwise sweeps.

use crate::utils::Parallelism;

/// Backend an objective call executes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Multi-threaded elementwise loop in host memory.
    Host,
    /// Data-parallel kernel over the device copy of a mirrored vector.
    Accelerator,
}

/// Device configuration handed to the objective factory.
///
/// `n_devices == 0` selects the host backend; any positive count selects the
/// accelerator backend. `n_threads` follows the thread-count semantics of
/// [`Parallelism::from_threads`] (0 = auto, 1 = sequential).
#[derive(Debug, Clone, Copy)]
pub struct DeviceContext {
    pub n_threads: usize,
    pub n_devices: usize,
}

impl DeviceContext {
    /// Host-only execution with automatic thread count.
    pub fn host() -> Self {
        Self {
            n_threads: 0,
            n_devices: 0,
        }
    }

    /// Host plus `n` accelerators.
    pub fn with_accelerators(n: usize) -> Self {
        Self {
            n_threads: 0,
            n_devices: n,
        }
    }

    /// Override the host thread count.
    pub fn threads(mut self, n: usize) -> Self {
        self.n_threads = n;
        self
    }

    /// Backend pointwise families execute on. The Cox sweep ignores this
    /// and always runs on the host.
    pub fn backend(&self) -> Backend {
        if self.n_devices > 0 {
            Backend::Accelerator
        } else {
            Backend::Host
        }
    }

    pub fn parallelism(&self) -> Parallelism {
        Parallelism::from_threads(self.n_threads)
    }
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_selection() {
        assert_eq!(DeviceContext::host().backend(), Backend::Host);
        assert_eq!(
            DeviceContext::with_accelerators(1).backend(),
            Backend::Accelerator
        );
        assert_eq!(DeviceContext::with_accelerators(0).backend(), Backend::Host);
    }

    #[test]
    fn thread_override() {
        let ctx = DeviceContext::host().threads(1);
        assert!(!ctx.parallelism().is_parallel());
    }
}
