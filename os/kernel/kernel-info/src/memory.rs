//! # Memory Layout

/// Capacity of the CPU record list.
pub const MAX_CPUS: usize = 32;

/// Capacity of the NUMA node record list.
pub const MAX_NODES: usize = 4;

/// Width of a 4 KiB page offset.
pub const PAGE_SIZE_BITS: u32 = 12;

/// Size of a 4 KiB page.
pub const PAGE_SIZE: u64 = 1 << PAGE_SIZE_BITS;

/// Physical address the secondary-processor trampoline is copied to.
///
/// # Startup IPI
/// The Startup IPI vector is the page number of this address, so it must be
/// page aligned and below [`REAL_MODE_LIMIT`].
pub const AP_TRAMPOLINE_ADDR: u64 = 1 << PAGE_SIZE_BITS;

/// Highest address a real-mode startup vector can reach.
pub const REAL_MODE_LIMIT: u64 = 0x10_0000; // 1 MiB

/// Multiboot2 reports memory sizes in KiB.
pub const MEM_LOWER_SHIFT: u32 = 10;

/// Architectural default base of the memory-mapped local APIC.
pub const XAPIC_BASE_ADDRESS: u64 = 0xFEE0_0000;

/// Converts a Multiboot2 KiB size into bytes.
#[must_use]
#[allow(clippy::cast_lossless)]
pub const fn kib_to_bytes(kib: u32) -> u64 {
    (kib as u64) << MEM_LOWER_SHIFT
}

const _: () = {
    assert!(AP_TRAMPOLINE_ADDR.is_multiple_of(PAGE_SIZE));
    assert!(AP_TRAMPOLINE_ADDR < REAL_MODE_LIMIT);
    assert!(REAL_MODE_LIMIT >> PAGE_SIZE_BITS <= 256);
    assert!(MAX_CPUS <= u32::MAX as usize);
};
