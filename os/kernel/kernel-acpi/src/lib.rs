//! # ACPI (Advanced Configuration and Power Interface) Support
//!
//! Early-boot discovery of processors and NUMA topology from firmware tables.
//! Only the two tables the boot path needs are interpreted: the MADT (which
//! processors exist) and the SRAT (which NUMA node each processor belongs to).
//!
//! ## Architecture
//!
//! ```text
//! Multiboot2 RSDP tag
//!     ↓
//! RSDP (ACPI 1.0) / XSDP (ACPI 2.0+)     checksum over 20 bytes, then the extension
//!     ↓
//! RSDT (32-bit entries) / XSDT (64-bit entries)
//!     ↓                                  every entry inspected, in table order
//! "APIC" → MADT    "SRAT" → SRAT         anything else is skipped
//! ```
//!
//! ## Untrusted Input
//!
//! Every table comes from firmware and is treated as hostile:
//! * **Checksums**: every table, including the root, must byte-sum to zero
//!   over its declared length before any field is read.
//! * **Bounds**: all reads go through [`TableCursor`] or [`walk_by_length`],
//!   which refuse to read past the mapped region and report
//!   [`AcpiError::Truncated`] instead.
//! * **Containment**: a bad MADT or SRAT is skipped; a bad root pointer or
//!   root table stops discovery before anything is recorded.
//!
//! ## Physical Memory Access ([`PhysMapRo`])
//! Table addresses are physical. The parser never dereferences them itself;
//! the caller supplies a mapper (identity map in early boot, a fake physical
//! memory in tests).

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

#[cfg(any(test, feature = "fixtures"))]
extern crate alloc;

mod cursor;
mod discover;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod madt;
pub mod rsdp;
pub mod sdt;
pub mod srat;

pub use cursor::{Records, TableCursor, walk_by_length};
pub use discover::{Discovered, parse_root_pointer, try_parse_root_pointer};

use core::fmt;

/// Map a physical region and return a *read-only* byte slice for its contents.
/// You provide the implementation (identity map, kmap, etc.).
pub trait PhysMapRo {
    /// Returns the `len` bytes starting at physical address `paddr`, or `None`
    /// if that region is not accessible.
    fn map_ro(&self, paddr: u64, len: usize) -> Option<&[u8]>;
}

/// Sum of all bytes modulo 256. A region is valid iff this is zero.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |a, &b| a.wrapping_add(b))
}

/// Whether `bytes` checksums to zero.
#[must_use]
pub fn is_valid(bytes: &[u8]) -> bool {
    checksum(bytes) == 0
}

/// A 4-byte ACPI table signature.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 4]);

impl Signature {
    /// Pseudo-signature used when reporting root pointer errors.
    pub const RSDP: Self = Self(*b"RSDP");
    pub const RSDT: Self = Self(*b"RSDT");
    pub const XSDT: Self = Self(*b"XSDT");
    pub const MADT: Self = Self(*b"APIC");
    pub const SRAT: Self = Self(*b"SRAT");
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;
        for &b in &self.0 {
            f.write_char(if b.is_ascii_graphic() { char::from(b) } else { '?' })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcpiError {
    #[error("checksum mismatch in {signature} table")]
    ChecksumMismatch { signature: Signature },
    #[error("table is truncated")]
    Truncated,
    #[error("physical region at {address:#x} is not mapped")]
    Unmapped { address: u64 },
    #[error("{signature} table declares invalid length {length}")]
    InvalidLength { signature: Signature, length: u32 },
}
