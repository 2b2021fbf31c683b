//! # Model-Specific Registers (MSR)
//!
//! Raw `rdmsr`/`wrmsr` access by register index. The two registers the
//! bring-up path uses are:
//! - `IA32_APIC_BASE` (`0x1B`): local APIC base address and mode bits.
//! - `IA32_X2APIC_ICR` (`0x830`): the 64-bit interrupt command register in
//!   x2APIC mode.
//!
//! ## References
//! - Intel SDM Vol. 3, §11.4.4 "Local APIC Status and Location"
//! - Intel SDM Vol. 3, §11.12.9 "ICR Operation in x2APIC Mode"

/// Identifies a **Model-Specific Register (MSR)** by its architectural index.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Msr(pub u32);

impl Msr {
    pub const IA32_APIC_BASE: Self = Self(0x1B);
    pub const IA32_X2APIC_ICR: Self = Self(0x830);

    /// Returns the underlying raw MSR index.
    #[inline(always)]
    #[allow(clippy::inline_always)]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Write a 64-bit value to this MSR.
    ///
    /// # Safety
    /// - Executes the privileged `WRMSR` instruction, which is only valid at
    ///   **CPL=0**. In user mode it raises **#GP(0)**.
    /// - The MSR must be **valid and writable** on the current CPU; writing an
    ///   invalid or reserved MSR raises **#GP(0)** as well.
    #[cfg(all(feature = "asm", target_arch = "x86_64"))]
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    #[doc(alias = "wrmsr")]
    pub unsafe fn store_raw(self, val: u64) {
        let lo = (val & 0xFFFF_FFFF) as u32;
        let hi = (val >> 32) as u32;
        let msr = self.raw();
        unsafe {
            core::arch::asm!(
            "wrmsr",
            in("ecx") msr,
            in("eax") lo,
            in("edx") hi,
            options(nostack, preserves_flags)
            );
        }
    }

    /// Reads the 64-bit value of this MSR.
    ///
    /// # Safety
    /// Same requirements as [`store_raw`](Self::store_raw), for `RDMSR`.
    #[cfg(all(feature = "asm", target_arch = "x86_64"))]
    #[inline(always)]
    #[allow(clippy::inline_always)]
    #[doc(alias = "rdmsr")]
    #[must_use]
    pub unsafe fn load_raw(self) -> u64 {
        let lo: u32;
        let hi: u32;
        let ecx = self.raw();
        unsafe {
            core::arch::asm!(
            "rdmsr",
            in("ecx") ecx,
            out("eax") lo,
            out("edx") hi,
            options(nomem, nostack, preserves_flags)
            );
        }
        (u64::from(hi) << 32) | u64::from(lo)
    }
}
