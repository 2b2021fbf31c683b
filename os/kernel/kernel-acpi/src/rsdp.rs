//! # RSDP/XSDP (Root/Extended System Description Pointer)

use crate::{AcpiError, Signature, TableCursor, is_valid};

/// Length of the ACPI 1.0 structure covered by the legacy checksum.
pub const RSDP_V1_LEN: usize = 20;

/// Length of the ACPI 2.0 extension (`length`, `xsdt_addr`, `ext_checksum`, `reserved`).
pub const RSDP_V2_EXTENSION_LEN: usize = 16;

/// Offset of `rsdt_addr` within the legacy structure.
const RSDT_ADDR_OFFSET: usize = 16;

/// Offset of `revision` within the legacy structure.
const REVISION_OFFSET: usize = 15;

/// A validated root pointer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RootPointer {
    /// ACPI 1.0: the root is the RSDT with 32-bit entries.
    V1 { rsdt_addr: u32 },
    /// ACPI 2.0+: the root is the XSDT with 64-bit entries.
    V2 { rsdt_addr: u32, xsdt_addr: u64 },
}

impl RootPointer {
    /// Validate the RSDP/XSDP bytes as handed over by the boot loader.
    ///
    /// The 20-byte legacy region must checksum to zero before any field is
    /// read. For revision 2 and later the extension must checksum to zero as
    /// well; the two sums together equal the ACPI extended checksum.
    ///
    /// # Errors
    /// * [`AcpiError::ChecksumMismatch`] if either region fails its checksum.
    /// * [`AcpiError::Truncated`] if `raw` is too short for its revision.
    pub fn parse(raw: &[u8]) -> Result<Self, AcpiError> {
        let legacy = raw.get(..RSDP_V1_LEN).ok_or(AcpiError::Truncated)?;
        if !is_valid(legacy) {
            return Err(AcpiError::ChecksumMismatch {
                signature: Signature::RSDP,
            });
        }

        let mut c = TableCursor::new(legacy);
        c.skip(REVISION_OFFSET)?;
        let revision = c.read_u8()?;
        debug_assert_eq!(c.position(), RSDT_ADDR_OFFSET);
        let rsdt_addr = c.read_u32()?;

        if revision < 2 {
            return Ok(Self::V1 { rsdt_addr });
        }

        let extension = raw
            .get(RSDP_V1_LEN..RSDP_V1_LEN + RSDP_V2_EXTENSION_LEN)
            .ok_or(AcpiError::Truncated)?;
        if !is_valid(extension) {
            return Err(AcpiError::ChecksumMismatch {
                signature: Signature::RSDP,
            });
        }

        let mut c = TableCursor::new(extension);
        let _length = c.read_u32()?;
        let xsdt_addr = c.read_u64()?;

        Ok(Self::V2 {
            rsdt_addr,
            xsdt_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn parses_acpi_1_pointer() {
        let raw = fixtures::rsdp_v1(0x000E_1000);
        assert_eq!(
            RootPointer::parse(&raw),
            Ok(RootPointer::V1 { rsdt_addr: 0x000E_1000 })
        );
    }

    #[test]
    fn parses_acpi_2_pointer() {
        let raw = fixtures::rsdp_v2(0x1_0000_2000);
        assert_eq!(
            RootPointer::parse(&raw),
            Ok(RootPointer::V2 {
                rsdt_addr: 0,
                xsdt_addr: 0x1_0000_2000
            })
        );
    }

    #[test]
    fn rejects_bad_legacy_checksum() {
        let mut raw = fixtures::rsdp_v1(0x1000);
        raw[16] ^= 0x40;
        assert_eq!(
            RootPointer::parse(&raw),
            Err(AcpiError::ChecksumMismatch {
                signature: Signature::RSDP
            })
        );
    }

    #[test]
    fn rejects_bad_extension_checksum() {
        let mut raw = fixtures::rsdp_v2(0x2000);
        raw[24] ^= 0x01;
        assert!(matches!(
            RootPointer::parse(&raw),
            Err(AcpiError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn revision_2_needs_the_extension() {
        let raw = fixtures::rsdp_v2(0x2000);
        assert_eq!(
            RootPointer::parse(&raw[..RSDP_V1_LEN]),
            Err(AcpiError::Truncated)
        );
        assert_eq!(RootPointer::parse(&raw[..12]), Err(AcpiError::Truncated));
    }
}
