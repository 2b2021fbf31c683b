//! # Boot Sequence
//!
//! [`BootState`] holds everything the boot processor shares with the
//! secondaries: the rendezvous counter, the CPU slots handed out during
//! bring-up, and the boot information published afterwards. It is meant to
//! live in a `static`.

use crate::tracing::trace_boot_info;
use kernel_acpi::PhysMapRo;
use kernel_info::{BootInfo, TopologyError};
use kernel_multiboot2::{BootInfoError, collect_boot_info};
use kernel_smp::{CpuSlots, IpiSender, SmpError, Trampoline, check_in, start_secondaries};
use kernel_sync::{Rendezvous, SyncOnceCell};
use log::debug;

/// A condition that stops the boot sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootError {
    #[error(transparent)]
    BootInfo(#[from] BootInfoError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Smp(#[from] SmpError),
    #[error("the boot sequence has already run")]
    AlreadyBooted,
    #[error("only {online} of {expected} processors checked in")]
    Incomplete { online: usize, expected: usize },
}

/// Identity of the boot processor, as reported by the boot stub.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BootProcessor {
    pub apic_id: u32,
    /// Width of the SMT (thread) field of the APIC id.
    pub thread_bits: u32,
    /// Width of the core field of the APIC id.
    pub core_bits: u32,
}

pub struct BootState {
    rendezvous: Rendezvous,
    slots: SyncOnceCell<CpuSlots>,
    info: SyncOnceCell<BootInfo>,
}

impl Default for BootState {
    fn default() -> Self {
        Self::new()
    }
}

impl BootState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rendezvous: Rendezvous::new(),
            slots: SyncOnceCell::new(),
            info: SyncOnceCell::new(),
        }
    }

    #[must_use]
    pub const fn rendezvous(&self) -> &Rendezvous {
        &self.rendezvous
    }

    /// The boot information, once every processor has checked in.
    #[must_use]
    pub fn boot_info(&self) -> Option<&BootInfo> {
        self.info.get()
    }

    /// Runs the boot sequence on the boot processor.
    ///
    /// Collects the boot information from the Multiboot2 blob, resolves the
    /// NUMA topology, records the boot processor in slot 0, copies
    /// `trampoline` into `low_memory` (the memory at the trampoline address)
    /// and starts every secondary processor through the IPI sender that
    /// `connect_ipi` builds from the collected information. Returns the
    /// published boot information.
    ///
    /// # Errors
    /// * [`BootError::BootInfo`] if a required Multiboot2 tag is missing or
    ///   the blob is malformed.
    /// * [`BootError::Topology`] if the SRAT names an unknown processor.
    /// * [`BootError::Smp`] if the trampoline does not fit in lower memory.
    /// * [`BootError::AlreadyBooted`] on a second call.
    pub fn run<M, I>(
        &self,
        map: &M,
        multiboot: &[u8],
        bsp: BootProcessor,
        trampoline: &[u8],
        low_memory: &mut [u8],
        connect_ipi: impl FnOnce(&BootInfo) -> I,
    ) -> Result<&BootInfo, BootError>
    where
        M: PhysMapRo,
        I: IpiSender,
    {
        if self.slots.is_initialized() {
            return Err(BootError::AlreadyBooted);
        }

        let mut info = collect_boot_info(map, multiboot)?;
        info.resolve_topology()?;
        let recorded = info.record_boot_processor(bsp.apic_id, bsp.thread_bits, bsp.core_bits);
        debug_assert!(recorded.is_inserted(), "slot 0 is always available");
        trace_boot_info(&info);

        let trampoline = Trampoline::place(trampoline, low_memory, info.mem_lower_kib)?;
        let mut ipi = connect_ipi(&info);

        let slots = self
            .slots
            .set(CpuSlots::from_boot_info(info))
            .map_err(|_| BootError::AlreadyBooted)?;
        let online = start_secondaries(slots, &self.rendezvous, &mut ipi, &trampoline);

        let info = slots
            .snapshot(&self.rendezvous)
            .ok_or_else(|| BootError::Incomplete {
                online,
                expected: slots.num_cpus(),
            })?;
        Ok(self.info.get_or_init(|| info))
    }

    /// Checks in the calling secondary processor. Returns its CPU index, or
    /// `None` if bring-up has not started or every slot is taken.
    ///
    /// # Safety
    /// Must be called once per secondary processor, by the processor most
    /// recently started by [`BootState::run`].
    #[must_use]
    pub unsafe fn check_in(&self, apic_id: u32, thread_bits: u32, core_bits: u32) -> Option<usize> {
        let slots = self.slots.get()?;
        // SAFETY: forwarded from this function's contract.
        let index = unsafe { check_in(slots, &self.rendezvous, apic_id, thread_bits, core_bits) }?;
        debug!("CPU {index} (APIC id {apic_id}) checked in");
        Some(index)
    }
}
