//! Synthetic firmware tables and a fake physical memory for tests.
//!
//! Every builder returns a table with a correct checksum; tests corrupt
//! bytes afterwards when they need a bad one.

use crate::PhysMapRo;
use crate::rsdp::{RSDP_V1_LEN, RSDP_V2_EXTENSION_LEN};
use crate::sdt::SDT_HEADER_LEN;
use alloc::vec;
use alloc::vec::Vec;

/// A flat window of "physical" memory starting at `base`.
#[derive(Debug, Clone)]
pub struct FakePhys {
    base: u64,
    memory: Vec<u8>,
}

impl FakePhys {
    /// Zero-filled memory covering `base..base + size`.
    #[must_use]
    pub fn new(base: u64, size: usize) -> Self {
        Self {
            base,
            memory: vec![0; size],
        }
    }

    /// Copies `bytes` to physical address `addr`.
    ///
    /// # Panics
    /// If the bytes do not fit inside the window.
    pub fn place(&mut self, addr: u64, bytes: &[u8]) -> &mut Self {
        let start = usize::try_from(addr - self.base).expect("address inside window");
        self.memory[start..start + bytes.len()].copy_from_slice(bytes);
        self
    }
}

impl PhysMapRo for FakePhys {
    fn map_ro(&self, paddr: u64, len: usize) -> Option<&[u8]> {
        let start = usize::try_from(paddr.checked_sub(self.base)?).ok()?;
        self.memory.get(start..start.checked_add(len)?)
    }
}

/// Stores the byte that makes `bytes` sum to zero at `at`.
pub fn seal(bytes: &mut [u8], at: usize) {
    bytes[at] = 0;
    bytes[at] = 0u8.wrapping_sub(crate::checksum(bytes));
}

/// A system description table with the given signature and body.
#[must_use]
pub fn sdt(signature: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let length = u32::try_from(SDT_HEADER_LEN + body.len()).unwrap_or(u32::MAX);
    let mut table = Vec::with_capacity(SDT_HEADER_LEN + body.len());
    table.extend_from_slice(signature);
    table.extend_from_slice(&length.to_le_bytes());
    table.push(1); // revision
    table.push(0); // checksum
    table.extend_from_slice(b"NOVAFW"); // OEM ID
    table.extend_from_slice(b"FIXTURE "); // OEM table ID
    table.extend_from_slice(&1u32.to_le_bytes()); // OEM revision
    table.extend_from_slice(b"TEST"); // creator ID
    table.extend_from_slice(&1u32.to_le_bytes()); // creator revision
    debug_assert_eq!(table.len(), SDT_HEADER_LEN);
    table.extend_from_slice(body);
    seal(&mut table, 9);
    table
}

/// An RSDT pointing at the given tables.
#[must_use]
pub fn rsdt(entries: &[u32]) -> Vec<u8> {
    let body: Vec<u8> = entries.iter().flat_map(|e| e.to_le_bytes()).collect();
    sdt(b"RSDT", &body)
}

/// An XSDT pointing at the given tables.
#[must_use]
pub fn xsdt(entries: &[u64]) -> Vec<u8> {
    let body: Vec<u8> = entries.iter().flat_map(|e| e.to_le_bytes()).collect();
    sdt(b"XSDT", &body)
}

/// A Processor Local APIC structure.
#[derive(Debug, Copy, Clone)]
pub struct Processor {
    pub apic_id: u8,
    pub flags: u32,
}

impl Processor {
    #[must_use]
    pub const fn enabled(apic_id: u8) -> Self {
        Self { apic_id, flags: 1 }
    }

    #[must_use]
    pub const fn disabled(apic_id: u8) -> Self {
        Self { apic_id, flags: 0 }
    }
}

/// A MADT listing the given processors. Processor UIDs count up from zero.
#[must_use]
pub fn madt(local_apic_address: u32, processors: &[Processor]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&local_apic_address.to_le_bytes());
    body.extend_from_slice(&1u32.to_le_bytes()); // PC-AT compatible
    for (uid, p) in processors.iter().enumerate() {
        let uid = u8::try_from(uid).unwrap_or(u8::MAX);
        body.extend_from_slice(&[0, 8, uid, p.apic_id]);
        body.extend_from_slice(&p.flags.to_le_bytes());
    }
    sdt(b"APIC", &body)
}

/// A Processor Local APIC Affinity structure.
#[derive(Debug, Copy, Clone)]
pub struct Affinity {
    pub proximity_domain: u32,
    pub apic_id: u8,
    pub flags: u32,
}

impl Affinity {
    #[must_use]
    pub const fn enabled(proximity_domain: u32, apic_id: u8) -> Self {
        Self {
            proximity_domain,
            apic_id,
            flags: 1,
        }
    }

    #[must_use]
    pub const fn disabled(proximity_domain: u32, apic_id: u8) -> Self {
        Self {
            proximity_domain,
            apic_id,
            flags: 0,
        }
    }
}

/// A SRAT listing the given processor affinities.
#[must_use]
pub fn srat(affinities: &[Affinity]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&1u32.to_le_bytes()); // reserved, must be 1
    body.extend_from_slice(&[0; 8]);
    for a in affinities {
        let [d0, d1, d2, d3] = a.proximity_domain.to_le_bytes();
        body.extend_from_slice(&[0, 16, d0, a.apic_id]);
        body.extend_from_slice(&a.flags.to_le_bytes());
        body.extend_from_slice(&[0, d1, d2, d3]);
        body.extend_from_slice(&0u32.to_le_bytes()); // clock domain
    }
    sdt(b"SRAT", &body)
}

/// An ACPI 1.0 RSDP pointing at `rsdt_addr`.
#[must_use]
pub fn rsdp_v1(rsdt_addr: u32) -> Vec<u8> {
    let mut raw = Vec::with_capacity(RSDP_V1_LEN);
    raw.extend_from_slice(b"RSD PTR ");
    raw.push(0); // checksum
    raw.extend_from_slice(b"NOVAFW");
    raw.push(0); // revision
    raw.extend_from_slice(&rsdt_addr.to_le_bytes());
    seal(&mut raw, 8);
    raw
}

/// An ACPI 2.0 XSDP pointing at `xsdt_addr`, with no RSDT.
#[must_use]
pub fn rsdp_v2(xsdt_addr: u64) -> Vec<u8> {
    let mut raw = rsdp_v1(0);
    raw[15] = 2;
    seal(&mut raw, 8);

    let length = u32::try_from(RSDP_V1_LEN + RSDP_V2_EXTENSION_LEN).unwrap_or(u32::MAX);
    raw.extend_from_slice(&length.to_le_bytes());
    raw.extend_from_slice(&xsdt_addr.to_le_bytes());
    raw.push(0); // extended checksum
    raw.extend_from_slice(&[0; 3]);
    let mut extension = raw.split_off(RSDP_V1_LEN);
    seal(&mut extension, 12);
    raw.append(&mut extension);
    raw
}
