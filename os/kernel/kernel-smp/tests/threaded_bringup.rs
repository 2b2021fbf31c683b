use kernel_info::BootInfo;
use kernel_smp::{CpuSlots, IpiSender, Trampoline, check_in, start_secondaries};
use kernel_sync::Rendezvous;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, Scope};

/// Each start-up IPI spawns a thread that plays the started processor.
struct SpawningIpi<'scope, 'env> {
    scope: &'scope Scope<'scope, 'env>,
    slots: &'env CpuSlots,
    rendezvous: &'env Rendezvous,
    inits: &'env AtomicUsize,
    startups: &'env AtomicUsize,
}

impl IpiSender for SpawningIpi<'_, '_> {
    fn send_init(&mut self, _target: u32) {
        self.inits.fetch_add(1, Ordering::Relaxed);
    }

    fn send_startup(&mut self, target: u32, vector: u8) {
        assert_eq!(vector, 1);
        self.startups.fetch_add(1, Ordering::Relaxed);
        let (slots, rendezvous) = (self.slots, self.rendezvous);
        self.scope.spawn(move || {
            thread::yield_now();
            // Thread id in bit 0, core id above it.
            let index = unsafe { check_in(slots, rendezvous, target, 1, 7) };
            assert!(index.is_some());
        });
    }
}

#[test]
fn every_secondary_checks_in_exactly_once() {
    let apic_ids = [0u32, 1, 2, 3, 6, 7, 12, 13];
    let mut info = BootInfo::new();
    for &apic_id in &apic_ids {
        assert!(info.push_cpu(apic_id).is_inserted());
    }
    assert!(info.record_boot_processor(0, 1, 7).is_inserted());

    let slots = CpuSlots::from_boot_info(info);
    let rendezvous = Rendezvous::new();
    let inits = AtomicUsize::new(0);
    let startups = AtomicUsize::new(0);
    let mut low_memory = [0u8; 64];
    let trampoline = Trampoline::place(&[0xFA, 0xF4], &mut low_memory, 639).unwrap();

    let online = thread::scope(|scope| {
        let mut ipi = SpawningIpi {
            scope,
            slots: &slots,
            rendezvous: &rendezvous,
            inits: &inits,
            startups: &startups,
        };
        start_secondaries(&slots, &rendezvous, &mut ipi, &trampoline)
    });

    assert_eq!(online, apic_ids.len());
    assert_eq!(inits.load(Ordering::Relaxed), apic_ids.len() - 1);
    assert_eq!(startups.load(Ordering::Relaxed), apic_ids.len() - 1);

    let info = slots.snapshot(&rendezvous).unwrap();
    let seen: Vec<(u32, u32)> = info.cpus().iter().map(|c| (c.apic_id, c.core_id)).collect();
    let expected: Vec<(u32, u32)> = apic_ids.iter().map(|&id| (id, id >> 1)).collect();
    assert_eq!(seen, expected);
}
