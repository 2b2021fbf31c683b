//! # Kernel
//!
//! Early boot on the boot processor:
//!
//! ```text
//! Multiboot2 information ──▶ kernel_multiboot2::collect_boot_info
//!                                 │  (memory tag, RSDP tag → kernel_acpi)
//!                                 ▼
//!                            BootInfo::resolve_topology
//!                                 ▼
//!                            BootInfo::record_boot_processor
//!                                 ▼
//!                            Trampoline::place → CpuSlots → start_secondaries
//!                                 ▼
//!                            published BootInfo ──▶ nf_main
//! ```
//!
//! The sequence lives in [`boot`] and is generic over physical memory access
//! and interprocessor interrupts, so it runs unchanged against synthetic
//! firmware images in host tests. The bare-metal entry points are in the
//! binary.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod boot;
pub mod tracing;

pub use boot::{BootError, BootProcessor, BootState};
