//! # System Description Tables
//!
//! Every ACPI table after the root pointer starts with the same 36-byte
//! header. Only the signature and the total length are consumed here; the
//! remaining 28 bytes (revision, checksum, OEM fields, creator fields) are
//! covered by the checksum but otherwise ignored.

use crate::rsdp::RootPointer;
use crate::{AcpiError, PhysMapRo, Signature, TableCursor, is_valid};

/// Size of the common SDT header.
pub const SDT_HEADER_LEN: usize = 36;

/// The consumed part of an SDT header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SdtHeader {
    pub signature: Signature,
    /// Total length of the table, header included.
    pub length: u32,
}

impl SdtHeader {
    /// Reads the header at the start of `bytes`.
    ///
    /// # Errors
    /// [`AcpiError::Truncated`] if `bytes` is shorter than the signature and length.
    pub fn parse(bytes: &[u8]) -> Result<Self, AcpiError> {
        let mut c = TableCursor::new(bytes);
        let signature = Signature(c.read_bytes()?);
        let length = c.read_u32()?;
        Ok(Self { signature, length })
    }

    /// Maps and reads the header of the table at `address`.
    ///
    /// # Errors
    /// [`AcpiError::Unmapped`] if the header cannot be mapped.
    pub fn read(map: &impl PhysMapRo, address: u64) -> Result<Self, AcpiError> {
        let bytes = map
            .map_ro(address, SDT_HEADER_LEN)
            .ok_or(AcpiError::Unmapped { address })?;
        Self::parse(bytes)
    }
}

/// A mapped table whose checksum has been verified over its declared length.
#[derive(Debug, Clone, Copy)]
pub struct Sdt<'a> {
    header: SdtHeader,
    bytes: &'a [u8],
}

impl<'a> Sdt<'a> {
    /// Maps the table at `address` and verifies its checksum.
    ///
    /// # Errors
    /// * [`AcpiError::Unmapped`] if the header or the body cannot be mapped.
    /// * [`AcpiError::InvalidLength`] if the declared length does not cover the header.
    /// * [`AcpiError::ChecksumMismatch`] if the table does not sum to zero.
    pub fn load<M: PhysMapRo>(map: &'a M, address: u64) -> Result<Self, AcpiError> {
        let header = SdtHeader::read(map, address)?;
        let length = usize::try_from(header.length).map_err(|_| AcpiError::InvalidLength {
            signature: header.signature,
            length: header.length,
        })?;
        if length < SDT_HEADER_LEN {
            return Err(AcpiError::InvalidLength {
                signature: header.signature,
                length: header.length,
            });
        }

        let bytes = map
            .map_ro(address, length)
            .ok_or(AcpiError::Unmapped { address })?;
        if !is_valid(bytes) {
            return Err(AcpiError::ChecksumMismatch {
                signature: header.signature,
            });
        }

        Ok(Self { header, bytes })
    }

    #[must_use]
    pub const fn header(&self) -> SdtHeader {
        self.header
    }

    #[must_use]
    pub const fn signature(&self) -> Signature {
        self.header.signature
    }

    /// Everything after the common header.
    #[must_use]
    pub fn body(&self) -> &'a [u8] {
        &self.bytes[SDT_HEADER_LEN..]
    }
}

/// Width of the entries in a root table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryWidth {
    /// RSDT: 32-bit physical addresses.
    U32,
    /// XSDT: 64-bit physical addresses.
    U64,
}

impl EntryWidth {
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }
}

/// A validated RSDT or XSDT.
#[derive(Debug, Clone, Copy)]
pub struct RootTable<'a> {
    sdt: Sdt<'a>,
    width: EntryWidth,
}

impl<'a> RootTable<'a> {
    /// Loads the root table the pointer designates: the XSDT for ACPI 2.0+,
    /// the RSDT otherwise.
    ///
    /// # Errors
    /// Any [`Sdt::load`] error. A root table that fails its checksum cannot be
    /// partially trusted, so the caller must stop discovery.
    pub fn load<M: PhysMapRo>(map: &'a M, pointer: RootPointer) -> Result<Self, AcpiError> {
        let (address, width) = match pointer {
            RootPointer::V1 { rsdt_addr } => (u64::from(rsdt_addr), EntryWidth::U32),
            RootPointer::V2 { xsdt_addr, .. } => (xsdt_addr, EntryWidth::U64),
        };
        let sdt = Sdt::load(map, address)?;
        Ok(Self { sdt, width })
    }

    #[must_use]
    pub const fn signature(&self) -> Signature {
        self.sdt.signature()
    }

    #[must_use]
    pub const fn width(&self) -> EntryWidth {
        self.width
    }

    /// Number of entries: `(length - header) / entry size`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sdt.body().len() / self.width.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physical addresses of the tables the root points to, in table order.
    pub fn entries(&self) -> impl Iterator<Item = u64> + 'a {
        let width = self.width;
        self.sdt
            .body()
            .chunks_exact(width.size())
            .map(move |entry| match width {
                EntryWidth::U32 => {
                    u64::from(u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]]))
                }
                EntryWidth::U64 => u64::from_le_bytes([
                    entry[0], entry[1], entry[2], entry[3], entry[4], entry[5], entry[6], entry[7],
                ]),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, FakePhys};

    #[test]
    fn loads_rsdt_entries() {
        let mut phys = FakePhys::new(0x1000, 0x1000);
        phys.place(0x1000, &fixtures::rsdt(&[0x1100, 0x1200, 0x1300]));

        let root = RootTable::load(&phys, RootPointer::V1 { rsdt_addr: 0x1000 }).unwrap();
        assert_eq!(root.signature(), Signature::RSDT);
        assert_eq!(root.width(), EntryWidth::U32);
        assert_eq!(root.len(), 3);
        assert_eq!(root.entries().collect::<Vec<_>>(), [0x1100, 0x1200, 0x1300]);
    }

    #[test]
    fn loads_xsdt_entries() {
        let mut phys = FakePhys::new(0x1000, 0x1000);
        phys.place(0x1800, &fixtures::xsdt(&[0x1_0000_0000, 0x1900]));

        let pointer = RootPointer::V2 {
            rsdt_addr: 0xDEAD,
            xsdt_addr: 0x1800,
        };
        let root = RootTable::load(&phys, pointer).unwrap();
        assert_eq!(root.width(), EntryWidth::U64);
        assert_eq!(root.entries().collect::<Vec<_>>(), [0x1_0000_0000, 0x1900]);
    }

    #[test]
    fn corrupt_root_table_is_rejected() {
        let mut phys = FakePhys::new(0x1000, 0x1000);
        let mut rsdt = fixtures::rsdt(&[0x1100]);
        rsdt[SDT_HEADER_LEN] ^= 0x10;
        phys.place(0x1000, &rsdt);

        assert_eq!(
            RootTable::load(&phys, RootPointer::V1 { rsdt_addr: 0x1000 }).err(),
            Some(AcpiError::ChecksumMismatch {
                signature: Signature::RSDT
            })
        );
    }

    #[test]
    fn length_shorter_than_header_is_rejected() {
        let mut phys = FakePhys::new(0, 0x100);
        let mut table = fixtures::sdt(b"TEST", &[]);
        table[4..8].copy_from_slice(&8u32.to_le_bytes());
        phys.place(0x10, &table);

        assert!(matches!(
            Sdt::load(&phys, 0x10),
            Err(AcpiError::InvalidLength { length: 8, .. })
        ));
    }

    #[test]
    fn unmapped_table_is_reported() {
        let phys = FakePhys::new(0x1000, 0x100);
        assert_eq!(
            Sdt::load(&phys, 0x8000).err(),
            Some(AcpiError::Unmapped { address: 0x8000 })
        );
    }
}
