//! # SRAT (System Resource Affinity Table)
//!
//! Maps processors (and memory) to NUMA proximity domains. After the common
//! header come 12 reserved bytes, then variable-length affinity structures.
//! Only Processor Local APIC Affinity structures (type 0) are interpreted.

use crate::cursor::structure_length;
use crate::sdt::Sdt;
use crate::{AcpiError, Signature, TableCursor, walk_by_length};
use bitfield_struct::bitfield;

/// Size of the reserved SRAT fields after the SDT header.
const SRAT_RESERVED_LEN: usize = 12;

/// Affinity structure type of a Processor Local APIC Affinity.
pub const PROCESSOR_LOCAL_APIC_AFFINITY: u8 = 0;

/// Flags of a Processor Local APIC Affinity structure.
#[bitfield(u32, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct AffinityFlags {
    /// Bit 0 — the entry is in use.
    pub enabled: bool,

    /// Bits 1–31 — Reserved.
    #[bits(31)]
    __: u32,
}

/// Processor Local APIC Affinity structure (type 0).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProcessorAffinity {
    /// Proximity domain, reassembled from its split encoding.
    pub proximity_domain: u32,
    pub apic_id: u8,
    pub flags: AffinityFlags,
    pub local_sapic_eid: u8,
    pub clock_domain: u32,
}

/// Reassembles the proximity domain: bits 7:0 are stored at offset 2, bits
/// 31:8 in the three bytes at offset 9.
#[must_use]
pub const fn proximity_domain(low: u8, high: [u8; 3]) -> u32 {
    u32::from_le_bytes([low, high[0], high[1], high[2]])
}

/// An affinity structure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SratEntry {
    ProcessorAffinity(ProcessorAffinity),
    /// Any structure type not interpreted here (memory, x2APIC, GICC, ...).
    Other { kind: u8, length: u8 },
}

impl SratEntry {
    fn parse(record: &[u8]) -> Result<Self, AcpiError> {
        let mut c = TableCursor::new(record);
        let kind = c.read_u8()?;
        let length = c.read_u8()?;
        if kind != PROCESSOR_LOCAL_APIC_AFFINITY {
            return Ok(Self::Other { kind, length });
        }

        let low = c.read_u8()?;
        let apic_id = c.read_u8()?;
        let flags = AffinityFlags::from_bits(c.read_u32()?);
        let local_sapic_eid = c.read_u8()?;
        let high = c.read_bytes::<3>()?;
        let clock_domain = c.read_u32()?;

        Ok(Self::ProcessorAffinity(ProcessorAffinity {
            proximity_domain: proximity_domain(low, high),
            apic_id,
            flags,
            local_sapic_eid,
            clock_domain,
        }))
    }
}

/// A checksum-verified SRAT.
#[derive(Debug, Clone, Copy)]
pub struct Srat<'a> {
    records: &'a [u8],
}

impl<'a> Srat<'a> {
    /// # Errors
    /// [`AcpiError::Truncated`] if the table is too short for its reserved fields.
    pub fn parse(sdt: &Sdt<'a>) -> Result<Self, AcpiError> {
        debug_assert_eq!(sdt.signature(), Signature::SRAT);
        let mut c = TableCursor::new(sdt.body());
        c.skip(SRAT_RESERVED_LEN)?;
        Ok(Self { records: c.rest() })
    }

    /// All affinity structures, in table order.
    pub fn entries(&self) -> impl Iterator<Item = Result<SratEntry, AcpiError>> + Clone + 'a {
        walk_by_length(self.records, structure_length)
            .map(|record| record.and_then(SratEntry::parse))
    }

    /// Processor affinities whose enabled flag is set.
    pub fn enabled_processors(
        &self,
    ) -> impl Iterator<Item = Result<ProcessorAffinity, AcpiError>> + Clone + 'a {
        self.entries().filter_map(|entry| match entry {
            Ok(SratEntry::ProcessorAffinity(affinity)) if affinity.flags.enabled() => {
                Some(Ok(affinity))
            }
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Affinity, FakePhys};

    #[test]
    fn proximity_domain_uses_all_four_bytes() {
        assert_eq!(proximity_domain(0, [0, 0, 0]), 0);
        assert_eq!(proximity_domain(0x01, [0x02, 0, 0]), 0x0201);
        assert_eq!(proximity_domain(0xAA, [0xBB, 0xCC, 0xDD]), 0xDDCC_BBAA);
    }

    #[test]
    fn clock_domain_does_not_leak_into_proximity_domain() {
        let mut phys = FakePhys::new(0, 0x1000);
        let mut body = vec![0; SRAT_RESERVED_LEN];
        // type 0, len 16, domain low 1, apic 4, flags enabled, sapic 0,
        // domain high 0, clock domain 0xFFFF_FFFF
        body.extend_from_slice(&[0, 16, 1, 4, 1, 0, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
        phys.place(0, &fixtures::sdt(b"SRAT", &body));

        let sdt = Sdt::load(&phys, 0).unwrap();
        let srat = Srat::parse(&sdt).unwrap();
        let affinity = srat.enabled_processors().next().unwrap().unwrap();
        assert_eq!(affinity.proximity_domain, 1);
        assert_eq!(affinity.apic_id, 4);
        assert_eq!(affinity.clock_domain, u32::MAX);
    }

    #[test]
    fn disabled_and_other_entries_are_skipped() {
        let mut phys = FakePhys::new(0, 0x1000);
        let srat = fixtures::srat(&[
            Affinity::enabled(0, 0),
            Affinity::disabled(0, 1),
            Affinity::enabled(1, 2),
        ]);
        phys.place(0x200, &srat);

        let sdt = Sdt::load(&phys, 0x200).unwrap();
        let srat = Srat::parse(&sdt).unwrap();
        let found: Vec<(u32, u8)> = srat
            .enabled_processors()
            .map(|a| a.map(|a| (a.proximity_domain, a.apic_id)).unwrap())
            .collect();
        assert_eq!(found, [(0, 0), (1, 2)]);
    }
}
