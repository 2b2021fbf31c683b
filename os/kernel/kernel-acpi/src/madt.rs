//! # MADT (Multiple APIC Description Table)
//!
//! After the common header the MADT carries the local interrupt controller
//! address and flags, followed by variable-length interrupt controller
//! structures. Only Processor Local APIC structures (type 0) are interpreted.

use crate::cursor::structure_length;
use crate::sdt::Sdt;
use crate::{AcpiError, Signature, TableCursor, walk_by_length};
use bitfield_struct::bitfield;

/// Size of the fixed MADT fields after the SDT header (address + flags).
const MADT_FIELDS_LEN: usize = 8;

/// Interrupt controller structure type of a Processor Local APIC.
pub const PROCESSOR_LOCAL_APIC: u8 = 0;

/// Flags of a Processor Local APIC structure.
#[bitfield(u32, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct LocalApicFlags {
    /// Bit 0 — the processor is ready for use.
    pub enabled: bool,

    /// Bit 1 — the processor can be enabled at run time (ACPI 6.3+).
    pub online_capable: bool,

    /// Bits 2–31 — Reserved.
    #[bits(30)]
    __: u32,
}

/// Processor Local APIC structure (type 0).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LocalApic {
    /// ACPI processor UID.
    pub uid: u8,
    pub apic_id: u8,
    pub flags: LocalApicFlags,
}

/// An interrupt controller structure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MadtEntry {
    LocalApic(LocalApic),
    /// Any structure type not interpreted here.
    Other { kind: u8, length: u8 },
}

impl MadtEntry {
    fn parse(record: &[u8]) -> Result<Self, AcpiError> {
        let mut c = TableCursor::new(record);
        let kind = c.read_u8()?;
        let length = c.read_u8()?;
        if kind != PROCESSOR_LOCAL_APIC {
            return Ok(Self::Other { kind, length });
        }

        let uid = c.read_u8()?;
        let apic_id = c.read_u8()?;
        let flags = LocalApicFlags::from_bits(c.read_u32()?);
        Ok(Self::LocalApic(LocalApic {
            uid,
            apic_id,
            flags,
        }))
    }
}

/// A checksum-verified MADT.
#[derive(Debug, Clone, Copy)]
pub struct Madt<'a> {
    /// Physical address of the local interrupt controller.
    pub local_apic_address: u32,
    flags: u32,
    records: &'a [u8],
}

impl<'a> Madt<'a> {
    /// MADT flag bit 0: the system also has dual 8259 PICs.
    pub const PCAT_COMPAT: u32 = 1;
    /// # Errors
    /// [`AcpiError::Truncated`] if the table is too short for its fixed fields.
    pub fn parse(sdt: &Sdt<'a>) -> Result<Self, AcpiError> {
        debug_assert_eq!(sdt.signature(), Signature::MADT);
        let mut c = TableCursor::new(sdt.body());
        let local_apic_address = c.read_u32()?;
        let flags = c.read_u32()?;
        debug_assert_eq!(c.position(), MADT_FIELDS_LEN);

        Ok(Self {
            local_apic_address,
            flags,
            records: c.rest(),
        })
    }

    /// Whether legacy 8259 PICs are installed next to the local APICs.
    #[must_use]
    pub const fn has_legacy_pics(&self) -> bool {
        self.flags & Self::PCAT_COMPAT != 0
    }

    /// All interrupt controller structures, in table order.
    pub fn entries(&self) -> impl Iterator<Item = Result<MadtEntry, AcpiError>> + Clone + 'a {
        walk_by_length(self.records, structure_length)
            .map(|record| record.and_then(MadtEntry::parse))
    }

    /// Processor Local APIC structures whose enabled flag is set.
    pub fn enabled_processors(
        &self,
    ) -> impl Iterator<Item = Result<LocalApic, AcpiError>> + Clone + 'a {
        self.entries().filter_map(|entry| match entry {
            Ok(MadtEntry::LocalApic(apic)) if apic.flags.enabled() => Some(Ok(apic)),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        })
    }
}
