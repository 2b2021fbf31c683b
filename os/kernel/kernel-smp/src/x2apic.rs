use crate::IpiSender;
use kernel_registers::{ApicBase, Icr, LoadRegisterUnsafe, Msr, StoreRegisterUnsafe};
use log::debug;

/// x2APIC interrupt command register (MSR `0x830`).
///
/// Each IPI is a single 64-bit write with a 32-bit destination. The
/// delivery status bit does not exist in this mode and INIT level
/// de-assert is not supported, so INIT is a single assert.
#[derive(Debug)]
pub struct X2Apic {
    _private: (),
}

impl X2Apic {
    /// Switches the calling processor's local APIC into x2APIC mode.
    ///
    /// # Safety
    /// Must run at CPL 0 on a processor that supports x2APIC
    /// (`CPUID.01H:ECX[21]`).
    #[must_use]
    pub unsafe fn enable() -> Self {
        let base = unsafe { ApicBase::load_unsafe() };
        debug!(
            "Local APIC base {:#x} (BSP: {}, x2APIC: {})",
            base.base_address(),
            base.bsp(),
            base.x2apic()
        );
        if !base.x2apic() {
            unsafe { base.with_enabled(true).with_x2apic(true).store_unsafe() };
        }
        Self { _private: () }
    }

    fn send(icr: Icr) {
        // SAFETY: x2APIC mode is enabled per `enable`.
        unsafe { Msr::IA32_X2APIC_ICR.store_raw(icr.into_bits()) };
    }
}

impl IpiSender for X2Apic {
    fn send_init(&mut self, target: u32) {
        Self::send(Icr::init_assert(target));
    }

    fn send_startup(&mut self, target: u32, vector: u8) {
        Self::send(Icr::startup(target, vector));
    }
}
