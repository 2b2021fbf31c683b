#[cfg(all(feature = "asm", target_arch = "x86_64"))]
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe, msr::Msr};
use bitfield_struct::bitfield;

/// `IA32_APIC_BASE` (MSR `0x1B`).
///
/// Location and operating mode of the local APIC.
#[bitfield(u64, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct ApicBase {
    /// Bits 0–7 — Reserved.
    #[bits(8)]
    __: u8,

    /// Bit 8 — BSP: set on the boot processor (read-only).
    #[bits(access = RO)]
    pub bsp: bool,

    /// Bit 9 — Reserved.
    __: bool,

    /// Bit 10 — EXTD: x2APIC mode enable.
    pub x2apic: bool,

    /// Bit 11 — EN: APIC global enable.
    pub enabled: bool,

    /// Bits 12–51 — APIC base page frame number.
    #[bits(40)]
    pub base_frame: u64,

    /// Bits 52–63 — Reserved.
    #[bits(12)]
    __: u16,
}

impl ApicBase {
    /// Physical address of the xAPIC MMIO page.
    #[must_use]
    pub const fn base_address(self) -> u64 {
        self.base_frame() << 12
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
impl LoadRegisterUnsafe for ApicBase {
    unsafe fn load_unsafe() -> Self {
        Self::from_bits(unsafe { Msr::IA32_APIC_BASE.load_raw() })
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
impl StoreRegisterUnsafe for ApicBase {
    unsafe fn store_unsafe(self) {
        unsafe { Msr::IA32_APIC_BASE.store_raw(self.into_bits()) };
    }
}
