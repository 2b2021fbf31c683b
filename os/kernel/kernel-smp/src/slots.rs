use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use kernel_info::memory::MAX_CPUS;
use kernel_info::{BootInfo, CpuInfo};
use kernel_sync::Rendezvous;

/// Boot information partitioned for bring-up.
///
/// The CPU records move into per-index slots. A slot is written only through
/// a [`SlotClaim`], and only the processor the rendezvous counter currently
/// designates may hold one.
pub struct CpuSlots {
    info: BootInfo,
    slots: [UnsafeCell<CpuInfo>; MAX_CPUS],
    len: usize,
}

// SAFETY: each slot has at most one writer (the processor the counter
// designates) and is read by others only before it is started or after the
// counter has moved past it.
unsafe impl Sync for CpuSlots {}

impl CpuSlots {
    #[must_use]
    pub fn from_boot_info(info: BootInfo) -> Self {
        let cpus = info.cpus();
        let len = cpus.len();
        let slots = core::array::from_fn(|i| UnsafeCell::new(cpus.get(i).copied().unwrap_or_default()));
        Self { info, slots, len }
    }

    #[must_use]
    pub const fn num_cpus(&self) -> usize {
        self.len
    }

    /// The APIC id recorded in slot `index`.
    ///
    /// Meant for the boot processor, for a slot whose processor has not been
    /// started yet or has already checked in.
    #[must_use]
    pub fn apic_id(&self, index: usize) -> Option<u32> {
        let slot = self.slots[..self.len].get(index)?;
        // SAFETY: per the read discipline above, nobody writes this slot now.
        Some(unsafe { (*slot.get()).apic_id })
    }

    /// Exclusive access to the slot at the current rendezvous index, or
    /// `None` if that index is past the last CPU record.
    ///
    /// # Safety
    /// Only the processor that was started for the current index may call
    /// this, once, and it must [`commit`](SlotClaim::commit) before any other
    /// processor claims.
    pub unsafe fn claim<'a>(&'a self, rendezvous: &'a Rendezvous) -> Option<SlotClaim<'a>> {
        let index = rendezvous.current();
        let slot = self.slots[..self.len].get(index)?;
        Some(SlotClaim {
            index,
            // SAFETY: exclusive per this function's contract.
            cpu: unsafe { &mut *slot.get() },
            rendezvous,
        })
    }

    /// A copy of the boot information with every checked-in identity, once
    /// all processors have checked in.
    #[must_use]
    pub fn snapshot(&self, rendezvous: &Rendezvous) -> Option<BootInfo> {
        if rendezvous.current() < self.len {
            return None;
        }
        let mut info = self.info.clone();
        for (cpu, slot) in info.cpus_mut().iter_mut().zip(&self.slots) {
            // SAFETY: every processor has committed; no slot is written anymore.
            *cpu = unsafe { *slot.get() };
        }
        Some(info)
    }

    /// Reassembles the boot information.
    #[must_use]
    pub fn into_boot_info(self) -> BootInfo {
        let Self { mut info, slots, .. } = self;
        for (cpu, slot) in info.cpus_mut().iter_mut().zip(slots) {
            *cpu = slot.into_inner();
        }
        info
    }
}

/// Exclusive access to one CPU record during check-in.
pub struct SlotClaim<'a> {
    index: usize,
    cpu: &'a mut CpuInfo,
    rendezvous: &'a Rendezvous,
}

impl SlotClaim<'_> {
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Publishes the slot and lets the boot processor move on. Returns the
    /// index that checked in.
    #[must_use = "the returned index is the slot that checked in"]
    pub fn commit(self) -> usize {
        self.rendezvous.arrive()
    }
}

impl Deref for SlotClaim<'_> {
    type Target = CpuInfo;

    fn deref(&self) -> &CpuInfo {
        self.cpu
    }
}

impl DerefMut for SlotClaim<'_> {
    fn deref_mut(&mut self) -> &mut CpuInfo {
        self.cpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots_for(apic_ids: &[u32]) -> CpuSlots {
        let mut info = BootInfo::new();
        for &apic_id in apic_ids {
            assert!(info.push_cpu(apic_id).is_inserted());
        }
        CpuSlots::from_boot_info(info)
    }

    #[test]
    fn claims_follow_the_counter() {
        let slots = slots_for(&[0, 4, 8]);
        let rendezvous = Rendezvous::new();
        assert_eq!(slots.apic_id(1), Some(4));

        let mut claim = unsafe { slots.claim(&rendezvous) }.unwrap();
        assert_eq!(claim.index(), 1);
        claim.identify(5, 1, 4);
        assert_eq!(claim.commit(), 1);

        let claim = unsafe { slots.claim(&rendezvous) }.unwrap();
        assert_eq!(claim.index(), 2);
        assert_eq!(claim.apic_id, 8);
        assert_eq!(claim.commit(), 2);

        assert!(unsafe { slots.claim(&rendezvous) }.is_none());
        let info = slots.into_boot_info();
        assert_eq!(info.cpus()[1], CpuInfo { apic_id: 5, node_id: 0, core_id: 2 });
        assert_eq!(info.cpus()[2].apic_id, 8);
    }

    #[test]
    fn snapshot_waits_for_every_processor() {
        let slots = slots_for(&[0, 1]);
        let rendezvous = Rendezvous::new();
        assert!(slots.snapshot(&rendezvous).is_none());

        let mut claim = unsafe { slots.claim(&rendezvous) }.unwrap();
        claim.identify(9, 0, 8);
        assert_eq!(claim.commit(), 1);

        let info = slots.snapshot(&rendezvous).unwrap();
        assert_eq!(info.cpus()[1].apic_id, 9);
        assert_eq!(info.num_cpus(), 2);
    }

    #[test]
    fn out_of_range_index_has_no_apic_id() {
        let slots = slots_for(&[0]);
        assert_eq!(slots.apic_id(0), Some(0));
        assert_eq!(slots.apic_id(1), None);
    }
}
