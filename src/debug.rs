//! Global flag for verbose probe output

use std::sync::atomic::{AtomicBool, Ordering};

/// Global verbose-output state
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable verbose probe output for the rest of the process
pub fn enable() {
    DEBUG_ENABLED.store(true, Ordering::Relaxed);
}

/// Check if verbose probe output is enabled
pub fn is_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Print a probe detail line to stderr when verbose output is enabled
pub fn log(message: &str) {
    if is_enabled() {
        eprintln!("[dotgate] {message}");
    }
}
