use crate::IpiSender;
use core::hint::spin_loop;
use core::ptr::NonNull;
use kernel_registers::Icr;
use log::warn;

/// Index of the ICR low doubleword (offset `0x300`).
const ICR_LOW: usize = 0x300 / 4;
/// Index of the ICR high doubleword (offset `0x310`).
const ICR_HIGH: usize = 0x310 / 4;

/// Memory-mapped xAPIC interrupt command register.
#[derive(Debug)]
pub struct XApic {
    regs: NonNull<u32>,
}

impl XApic {
    /// # Safety
    /// `base` must point to the local APIC register page (at least 4 KiB,
    /// mapped uncached) and stay valid for as long as this value is used.
    /// Nothing else may program the ICR concurrently.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u32>) -> Self {
        Self { regs: base }
    }

    fn read(&self, index: usize) -> u32 {
        // SAFETY: in bounds of the register page per `new`.
        unsafe { self.regs.add(index).read_volatile() }
    }

    fn write(&mut self, index: usize, value: u32) {
        // SAFETY: in bounds of the register page per `new`.
        unsafe { self.regs.add(index).write_volatile(value) }
    }

    fn wait_for_delivery(&self) {
        while Icr::from_bits(u64::from(self.read(ICR_LOW))).delivery_pending() {
            spin_loop();
        }
    }

    /// Writing the low doubleword sends the IPI, so the high one goes first.
    fn send(&mut self, icr: Icr) {
        self.wait_for_delivery();
        self.write(ICR_HIGH, icr.high());
        self.write(ICR_LOW, icr.low());
    }
}

/// xAPIC destinations are 8 bits wide.
fn destination(target: u32) -> Option<u32> {
    let Ok(apic_id) = u8::try_from(target) else {
        warn!("APIC id {target} is not addressable in xAPIC mode");
        return None;
    };
    Some(Icr::xapic_destination(apic_id))
}

impl IpiSender for XApic {
    fn send_init(&mut self, target: u32) {
        let Some(dest) = destination(target) else {
            return;
        };
        self.send(Icr::init_assert(dest));
        self.send(Icr::init_deassert(dest));
    }

    fn send_startup(&mut self, target: u32, vector: u8) {
        let Some(dest) = destination(target) else {
            return;
        };
        self.send(Icr::startup(dest, vector));
    }
}
