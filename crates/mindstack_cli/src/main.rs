//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `mindstack_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("mindstack_core ping={}", mindstack_core::ping());
    println!("mindstack_core version={}", mindstack_core::core_version());
}
