//! # Kernel Boot Information
//!
//! This crate holds the boot information model shared by every early-boot
//! stage: the Multiboot2 tag walker and the ACPI parser fill it, the topology
//! resolver refines it, and each secondary processor finally writes its own
//! identity into it during bring-up.
//!
//! ## Lifecycle
//!
//! ```text
//! BootInfo::new()                   zero-initialized, before any parsing
//!     ↓
//! Multiboot2 memory tag             mem_lower_kib / mem_upper_kib
//!     ↓
//! ACPI MADT / SRAT                  push_cpu / add_node_member (raw APIC ids)
//!     ↓
//! resolve_topology                  node members become CPU indices,
//!                                   CPUs learn their node id
//!     ↓
//! record_boot_processor             slot 0 = boot processor
//!     ↓
//! secondary processor check-in      slot n = n-th started processor
//! ```
//!
//! ## Capacity Policy
//!
//! The CPU and node lists are fixed-capacity ([`MAX_CPUS`](memory::MAX_CPUS),
//! [`MAX_NODES`](memory::MAX_NODES)). Running out of room is not an error:
//! every insertion reports an [`Insert`] outcome, and a full list simply stops
//! recording. Previously inserted records are never disturbed.
//!
//! ## Memory Layout ([`memory`])
//! Compile-time constants describing where the secondary-processor trampoline
//! lives in low physical memory and how firmware-reported sizes convert to bytes.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod memory;
mod topology;

pub use boot::{BootInfo, CpuInfo, Insert, NodeInfo};
pub use topology::{TopologyError, derive_core_id};
