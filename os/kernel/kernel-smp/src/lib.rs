//! # Multiprocessor Bring-up
//!
//! Starts the secondary processors listed in the boot information, one at a
//! time, from the boot processor.
//!
//! ```text
//! boot processor                                secondary processor n
//! --------------                                ---------------------
//! Trampoline::place (copy to AP_TRAMPOLINE_ADDR)
//! CpuSlots::from_boot_info
//! for n in 1..num_cpus:
//!     fence(SeqCst)
//!     INIT, SIPI(vector = trampoline page)  ──▶ trampoline → ap entry
//!     Rendezvous::wait_while_at(n)                check_in: claim slot n,
//!                                          ◀──    write {apic_id, core_id},
//!                                                 commit (counter = n + 1)
//!                                                 park
//! ```
//!
//! Only one secondary processor is in flight at a time and there is no
//! timeout: a processor that never checks in stalls bring-up.
//!
//! ## Interprocessor Interrupts ([`IpiSender`])
//! The INIT/SIPI pair goes through a trait so the same driver works with the
//! memory-mapped xAPIC ([`XApic`]), the MSR-based x2APIC ([`X2Apic`]) and
//! test doubles.
//!
//! ## Slot Handoff ([`CpuSlots`])
//! Once bring-up starts, the CPU records are no longer reachable through
//! `&mut BootInfo`. Each secondary processor obtains exclusive access to
//! exactly one record, the one the rendezvous counter designates, and gives
//! it up by advancing the counter.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod bringup;
mod ipi;
mod slots;
mod trampoline;
#[cfg(target_arch = "x86_64")]
mod x2apic;
mod xapic;

pub use bringup::{check_in, start_secondaries};
pub use ipi::IpiSender;
pub use slots::{CpuSlots, SlotClaim};
pub use trampoline::Trampoline;
#[cfg(target_arch = "x86_64")]
pub use x2apic::X2Apic;
pub use xapic::XApic;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SmpError {
    #[error("AP trampoline of {code_size} bytes does not fit below {limit:#x}")]
    TrampolineTooLarge { code_size: usize, limit: u64 },
}
