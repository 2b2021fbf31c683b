//! Builder for synthetic Multiboot2 boot information.

use crate::{HEADER_LEN, TAG_ALIGN, TAG_END, TAG_HEADER_LEN, TAG_MEMORY, TAG_RSDP_V1, TAG_RSDP_V2};
use alloc::vec::Vec;

/// Assembles a boot information blob tag by tag.
///
/// Tags are laid out in insertion order, each padded to the next 8-byte
/// boundary, behind the fixed `{total_size, reserved}` header.
#[derive(Debug, Default, Clone)]
pub struct MultibootBuilder {
    tags: Vec<u8>,
}

impl MultibootBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self { tags: Vec::new() }
    }

    /// Appends a raw tag. The size field covers the header and `payload`,
    /// not the padding.
    #[must_use]
    pub fn tag(mut self, kind: u32, payload: &[u8]) -> Self {
        let size = u32::try_from(TAG_HEADER_LEN + payload.len()).unwrap_or(u32::MAX);
        self.tags.extend_from_slice(&kind.to_le_bytes());
        self.tags.extend_from_slice(&size.to_le_bytes());
        self.tags.extend_from_slice(payload);
        let padded = self.tags.len().next_multiple_of(TAG_ALIGN);
        self.tags.resize(padded, 0);
        self
    }

    /// Appends a basic memory information tag.
    #[must_use]
    pub fn memory(self, mem_lower_kib: u32, mem_upper_kib: u32) -> Self {
        let mut payload = [0; 8];
        payload[..4].copy_from_slice(&mem_lower_kib.to_le_bytes());
        payload[4..].copy_from_slice(&mem_upper_kib.to_le_bytes());
        self.tag(TAG_MEMORY, &payload)
    }

    /// Appends an ACPI old RSDP tag wrapping `rsdp`.
    #[must_use]
    pub fn rsdp_v1(self, rsdp: &[u8]) -> Self {
        self.tag(TAG_RSDP_V1, rsdp)
    }

    /// Appends an ACPI new RSDP tag wrapping `rsdp`.
    #[must_use]
    pub fn rsdp_v2(self, rsdp: &[u8]) -> Self {
        self.tag(TAG_RSDP_V2, rsdp)
    }

    /// Terminates the tag list and prepends the header.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        self.tag(TAG_END, &[]).build_without_end()
    }

    /// Prepends the header without terminating the tag list.
    #[must_use]
    pub fn build_without_end(self) -> Vec<u8> {
        let total = u32::try_from(HEADER_LEN + self.tags.len()).unwrap_or(u32::MAX);
        let mut blob = Vec::with_capacity(HEADER_LEN + self.tags.len());
        blob.extend_from_slice(&total.to_le_bytes());
        blob.extend_from_slice(&0u32.to_le_bytes());
        blob.extend_from_slice(&self.tags);
        blob
    }
}
