//! # Kernel Entry Point
//!
//! The boot stub (outside this crate) switches to long mode, sets up a stack
//! and calls `kernel_main` on the boot processor; the trampoline
//! calls `ap_main` on each secondary processor. Both are only built for the
//! bare-metal target.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]
#![allow(unsafe_code)]

#[cfg(all(target_os = "none", target_arch = "x86_64"))]
mod entry;

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("The kernel runs bare-metal only; the boot sequence is tested through `kernel::boot`.");
}
