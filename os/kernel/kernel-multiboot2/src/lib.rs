//! # Multiboot2 Boot Information
//!
//! Walks the boot information the Multiboot2 loader leaves in memory and
//! turns it into a [`BootInfo`]:
//!
//! ```text
//! +-------------------+
//! | total_size: u32   |  fixed 8-byte header
//! | reserved:   u32   |
//! +-------------------+
//! | type: u32         |  tag, 8-byte aligned
//! | size: u32         |  header + payload, padding excluded
//! | payload ...       |
//! +-------------------+
//! | ...               |
//! +-------------------+
//! | type 0, size 8    |  end tag
//! +-------------------+
//! ```
//!
//! Only three tags matter here: basic memory information (type 4), which
//! supplies the lower/upper memory sizes, and the old (type 14) or new
//! (type 15) ACPI RSDP, which is handed to [`kernel_acpi`] for processor and
//! NUMA discovery. For both, the first occurrence wins.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

#[cfg(any(test, feature = "fixtures"))]
extern crate alloc;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

use core::fmt;
use kernel_acpi::{PhysMapRo, Records, TableCursor, walk_by_length};
use kernel_info::BootInfo;
use log::{debug, trace};

/// Size of the fixed `{total_size, reserved}` header.
pub const HEADER_LEN: usize = 8;

/// Size of the `{type, size}` header every tag starts with.
pub const TAG_HEADER_LEN: usize = 8;

/// Every tag starts on a multiple of this, measured from the first tag.
pub const TAG_ALIGN: usize = 8;

pub const TAG_END: u32 = 0;
pub const TAG_MEMORY: u32 = 4;
pub const TAG_RSDP_V1: u32 = 14;
pub const TAG_RSDP_V2: u32 = 15;

/// A tag the kernel cannot boot without.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequiredTag {
    /// Basic memory information (type 4).
    Memory,
    /// ACPI RSDP, old (type 14) or new (type 15).
    Rsdp,
}

impl fmt::Display for RequiredTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Rsdp => f.write_str("ACPI RSDP"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootInfoError {
    #[error("Multiboot2 {0} tag is missing")]
    MissingRequiredTag(RequiredTag),
    #[error("Multiboot2 boot information is truncated")]
    Truncated,
}

/// One Multiboot2 tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub kind: u32,
    /// Bytes after the tag header, up to the tag's declared size.
    pub payload: &'a [u8],
}

type TagSizeFn = fn(&[u8]) -> Option<usize>;

/// Iterator over the tags before the end tag.
///
/// A tag list that runs out (or breaks) before the end tag yields a single
/// [`BootInfoError::Truncated`].
#[derive(Debug, Clone)]
pub struct Tags<'a> {
    records: Records<'a, TagSizeFn>,
    done: bool,
}

impl<'a> Iterator for Tags<'a> {
    type Item = Result<Tag<'a>, BootInfoError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let Some(Ok(record)) = self.records.next() else {
            self.done = true;
            return Some(Err(BootInfoError::Truncated));
        };

        let Ok(kind) = TableCursor::new(record).read_u32() else {
            self.done = true;
            return Some(Err(BootInfoError::Truncated));
        };
        if kind == TAG_END {
            self.done = true;
            return None;
        }

        Some(Ok(Tag {
            kind,
            payload: &record[TAG_HEADER_LEN..],
        }))
    }
}

fn tag_size(bytes: &[u8]) -> Option<usize> {
    let mut c = TableCursor::new(bytes);
    c.skip(4).ok()?;
    let size = usize::try_from(c.read_u32().ok()?).ok()?;
    (size >= TAG_HEADER_LEN).then_some(size)
}

/// Reads `total_size` from the start of the boot information.
///
/// # Errors
/// [`BootInfoError::Truncated`] if `blob` is shorter than the header.
pub fn total_size(blob: &[u8]) -> Result<usize, BootInfoError> {
    TableCursor::new(blob)
        .read_u32()
        .ok()
        .and_then(|size| usize::try_from(size).ok())
        .ok_or(BootInfoError::Truncated)
}

/// The tags of the boot information in `blob`, up to the end tag.
///
/// # Errors
/// [`BootInfoError::Truncated`] if `blob` is shorter than its declared total size.
pub fn tags(blob: &[u8]) -> Result<Tags<'_>, BootInfoError> {
    let total = total_size(blob)?;
    let stream = blob.get(HEADER_LEN..total).ok_or(BootInfoError::Truncated)?;
    let record_length: TagSizeFn = tag_size;
    Ok(Tags {
        records: walk_by_length(stream, record_length).aligned(TAG_ALIGN),
        done: false,
    })
}

/// Collects memory sizes and, through the RSDP, processors and NUMA nodes.
///
/// ACPI problems do not fail this call: they are logged and leave the
/// processor and node lists as far as they got. Only the presence of the
/// required tags is checked.
///
/// # Errors
/// * [`BootInfoError::Truncated`] if the tag list is malformed or lacks the end tag.
/// * [`BootInfoError::MissingRequiredTag`] if no memory or no RSDP tag was seen.
pub fn collect_boot_info<M: PhysMapRo>(map: &M, blob: &[u8]) -> Result<BootInfo, BootInfoError> {
    let mut info = BootInfo::new();
    let mut memory_seen = false;
    let mut rsdp_seen = false;

    for tag in tags(blob)? {
        let tag = tag?;
        match tag.kind {
            TAG_MEMORY if !memory_seen => {
                let mut c = TableCursor::new(tag.payload);
                let lower = c.read_u32().map_err(|_| BootInfoError::Truncated)?;
                let upper = c.read_u32().map_err(|_| BootInfoError::Truncated)?;
                debug!("Multiboot2 memory: lower {lower} KiB, upper {upper} KiB");
                info.mem_lower_kib = lower;
                info.mem_upper_kib = upper;
                memory_seen = true;
            }
            TAG_RSDP_V1 | TAG_RSDP_V2 if !rsdp_seen => {
                debug!("Multiboot2 RSDP tag (type {})", tag.kind);
                kernel_acpi::parse_root_pointer(map, tag.payload, &mut info);
                rsdp_seen = true;
            }
            TAG_MEMORY | TAG_RSDP_V1 | TAG_RSDP_V2 => {
                debug!("Ignoring duplicate Multiboot2 tag (type {})", tag.kind);
            }
            kind => trace!("Skipping Multiboot2 tag (type {kind}, {} bytes)", tag.payload.len()),
        }
    }

    if !memory_seen {
        return Err(BootInfoError::MissingRequiredTag(RequiredTag::Memory));
    }
    if !rsdp_seen {
        return Err(BootInfoError::MissingRequiredTag(RequiredTag::Rsdp));
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::MultibootBuilder;
    use kernel_acpi::fixtures::{self as acpi, FakePhys, Processor};

    fn acpi_with_cpus(apic_ids: &[u8]) -> (FakePhys, Vec<u8>) {
        let processors: Vec<Processor> = apic_ids.iter().copied().map(Processor::enabled).collect();
        let mut phys = FakePhys::new(0x8000, 0x1000);
        phys.place(0x8000, &acpi::rsdt(&[0x8100]));
        phys.place(0x8100, &acpi::madt(0xFEE0_0000, &processors));
        (phys, acpi::rsdp_v1(0x8000))
    }

    #[test]
    fn tags_are_eight_byte_aligned() {
        let blob = MultibootBuilder::new()
            .tag(1, b"abc")
            .tag(2, &[7; 9])
            .build();
        let tags: Vec<Tag<'_>> = tags(&blob).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0], Tag { kind: 1, payload: b"abc" });
        assert_eq!(tags[1].kind, 2);
        assert_eq!(tags[1].payload, &[7; 9]);
    }

    #[test]
    fn memory_and_rsdp_are_collected() {
        let (phys, rsdp) = acpi_with_cpus(&[0, 1]);
        let blob = MultibootBuilder::new()
            .tag(1, b"cmdline\0")
            .memory(639, 130_048)
            .rsdp_v1(&rsdp)
            .build();

        let info = collect_boot_info(&phys, &blob).unwrap();
        assert_eq!(info.mem_lower_kib, 639);
        assert_eq!(info.mem_upper_kib, 130_048);
        assert_eq!(info.num_cpus(), 2);
    }

    #[test]
    fn missing_memory_tag_is_fatal_even_if_acpi_succeeds() {
        let (phys, rsdp) = acpi_with_cpus(&[0]);
        let blob = MultibootBuilder::new().rsdp_v1(&rsdp).build();
        assert_eq!(
            collect_boot_info(&phys, &blob),
            Err(BootInfoError::MissingRequiredTag(RequiredTag::Memory))
        );
    }

    #[test]
    fn missing_rsdp_tag_is_fatal() {
        let phys = FakePhys::new(0, 0x10);
        let blob = MultibootBuilder::new().memory(640, 0).build();
        assert_eq!(
            collect_boot_info(&phys, &blob),
            Err(BootInfoError::MissingRequiredTag(RequiredTag::Rsdp))
        );
    }

    #[test]
    fn invalid_rsdp_still_counts_as_present() {
        let (phys, mut rsdp) = acpi_with_cpus(&[0]);
        rsdp[8] ^= 0xFF;
        let blob = MultibootBuilder::new().memory(640, 0).rsdp_v1(&rsdp).build();

        let info = collect_boot_info(&phys, &blob).unwrap();
        assert_eq!(info.num_cpus(), 0);
    }

    #[test]
    fn first_memory_tag_wins() {
        let (phys, rsdp) = acpi_with_cpus(&[0]);
        let blob = MultibootBuilder::new()
            .memory(640, 1024)
            .memory(1, 2)
            .rsdp_v1(&rsdp)
            .build();

        let info = collect_boot_info(&phys, &blob).unwrap();
        assert_eq!((info.mem_lower_kib, info.mem_upper_kib), (640, 1024));
    }

    #[test]
    fn first_rsdp_tag_wins() {
        let (phys, rsdp) = acpi_with_cpus(&[4, 5]);
        let blob = MultibootBuilder::new()
            .memory(640, 0)
            .rsdp_v1(&rsdp)
            .rsdp_v2(&rsdp)
            .build();

        let info = collect_boot_info(&phys, &blob).unwrap();
        assert_eq!(info.num_cpus(), 2);
    }

    #[test]
    fn missing_end_tag_is_truncated() {
        let (phys, rsdp) = acpi_with_cpus(&[0]);
        let blob = MultibootBuilder::new()
            .memory(640, 0)
            .rsdp_v1(&rsdp)
            .build_without_end();
        assert_eq!(collect_boot_info(&phys, &blob), Err(BootInfoError::Truncated));
    }

    #[test]
    fn short_memory_tag_is_truncated() {
        let phys = FakePhys::new(0, 0x10);
        let blob = MultibootBuilder::new().tag(TAG_MEMORY, &[0; 4]).build();
        assert_eq!(collect_boot_info(&phys, &blob), Err(BootInfoError::Truncated));
    }

    #[test]
    fn declared_size_beyond_blob_is_truncated() {
        let mut blob = MultibootBuilder::new().memory(640, 0).build();
        blob[..4].copy_from_slice(&1024u32.to_le_bytes());
        assert_eq!(tags(&blob).err(), Some(BootInfoError::Truncated));
    }

    #[test]
    fn undersized_tag_is_truncated() {
        let mut blob = MultibootBuilder::new().memory(640, 0).build();
        blob[HEADER_LEN + 4..HEADER_LEN + 8].copy_from_slice(&4u32.to_le_bytes());
        let mut tags = tags(&blob).unwrap();
        assert_eq!(tags.next(), Some(Err(BootInfoError::Truncated)));
        assert_eq!(tags.next(), None);
    }
}
