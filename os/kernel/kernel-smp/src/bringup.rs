use crate::{CpuSlots, IpiSender, Trampoline};
use core::sync::atomic::{Ordering, fence};
use kernel_sync::Rendezvous;
use log::{info, warn};

/// Starts every secondary processor in slot order and returns the number of
/// processors online (the boot processor included).
///
/// For each index from the rendezvous counter up to the last CPU record,
/// sends INIT and a start-up IPI to that record's APIC id and spins until
/// the started processor has checked in. Never times out.
pub fn start_secondaries<I: IpiSender>(
    slots: &CpuSlots,
    rendezvous: &Rendezvous,
    ipi: &mut I,
    trampoline: &Trampoline,
) -> usize {
    let vector = trampoline.startup_vector();

    loop {
        let index = rendezvous.current();
        let Some(apic_id) = slots.apic_id(index) else {
            break;
        };
        info!("Starting CPU {index} with APIC id {apic_id}");

        // The trampoline and every slot write must be visible to the target.
        fence(Ordering::SeqCst);
        ipi.send_init(apic_id);
        ipi.send_startup(apic_id, vector);

        rendezvous.wait_while_at(index);
    }

    let online = rendezvous.current();
    info!("{online} of {} processors online", slots.num_cpus());
    online
}

/// Records the calling secondary processor in the slot the rendezvous
/// counter designates, then advances the counter. Returns the slot index, or
/// `None` if the counter is already past the last CPU record.
///
/// # Safety
/// Must be called once, by the processor most recently started by
/// [`start_secondaries`], as that processor's only write to the slots.
#[must_use]
pub unsafe fn check_in(
    slots: &CpuSlots,
    rendezvous: &Rendezvous,
    apic_id: u32,
    thread_bits: u32,
    core_bits: u32,
) -> Option<usize> {
    // SAFETY: forwarded from this function's contract.
    let Some(mut claim) = (unsafe { slots.claim(rendezvous) }) else {
        warn!("APIC id {apic_id} started without a free CPU slot");
        return None;
    };
    claim.identify(apic_id, thread_bits, core_bits);
    Some(claim.commit())
}
