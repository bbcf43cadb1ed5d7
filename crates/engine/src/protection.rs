//! Platform file-protection signal
//!
//! The host platform pushes availability changes into a shared
//! [`ProtectionSignal`]; stores only read it.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Whether platform file-level data protection is known to be available
#[derive(Debug, Default)]
pub struct ProtectionSignal {
    available: AtomicBool,
}

impl ProtectionSignal {
    /// Signal with an initial state
    pub fn new(available: bool) -> Self {
        ProtectionSignal {
            available: AtomicBool::new(available),
        }
    }

    /// Record a platform notification
    pub fn set_available(&self, available: bool) {
        let previous = self.available.swap(available, Ordering::AcqRel);
        if previous != available {
            info!(target: "smartstore::registry", available, "File data protection availability changed");
        }
    }

    /// Last state pushed by the platform
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }
}
