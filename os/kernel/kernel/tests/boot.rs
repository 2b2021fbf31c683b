use core::cell::RefCell;
use kernel::{BootError, BootProcessor, BootState};
use kernel_acpi::fixtures::{self as acpi, Affinity, FakePhys, Processor};
use kernel_info::TopologyError;
use kernel_multiboot2::fixtures::MultibootBuilder;
use kernel_smp::{IpiSender, SmpError};

const TRAMPOLINE: [u8; 4] = [0xFA, 0xF4, 0xEB, 0xFD];

const BSP: BootProcessor = BootProcessor {
    apic_id: 0,
    thread_bits: 1,
    core_bits: 7,
};

/// Records every IPI and checks the started processor in before returning.
struct Recording<'a> {
    state: &'a BootState,
    sent: &'a RefCell<Vec<Ipi>>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Ipi {
    Init(u32),
    Startup(u32),
}

impl IpiSender for Recording<'_> {
    fn send_init(&mut self, target: u32) {
        self.sent.borrow_mut().push(Ipi::Init(target));
    }

    fn send_startup(&mut self, target: u32, vector: u8) {
        assert_eq!(vector, 1, "trampoline lives in page 1");
        self.sent.borrow_mut().push(Ipi::Startup(target));
        let checked_in = unsafe { self.state.check_in(target, BSP.thread_bits, BSP.core_bits) };
        assert!(checked_in.is_some());
    }
}

/// XSDT at 0xE0000 listing a MADT and an SRAT, reached through an ACPI 2.0 RSDP.
fn firmware(processors: &[Processor], affinities: &[Affinity]) -> (FakePhys, Vec<u8>) {
    let mut phys = FakePhys::new(0xE_0000, 0x1000);
    phys.place(0xE_0000, &acpi::xsdt(&[0xE_0100, 0xE_0200]))
        .place(0xE_0100, &acpi::madt(0xFEE0_0000, processors))
        .place(0xE_0200, &acpi::srat(affinities));
    (phys, acpi::rsdp_v2(0xE_0000))
}

#[test]
fn two_processors_on_one_node_boot_end_to_end() {
    let (phys, rsdp) = firmware(
        &[Processor::enabled(0), Processor::enabled(2)],
        &[Affinity::enabled(0, 0), Affinity::enabled(0, 2)],
    );
    let blob = MultibootBuilder::new()
        .memory(640, 64 * 1024)
        .rsdp_v2(&rsdp)
        .build();
    let mut low_memory = vec![0u8; 0x1000];

    let state = BootState::new();
    let sent = RefCell::new(Vec::new());
    let info = state
        .run(&phys, &blob, BSP, &TRAMPOLINE, &mut low_memory, |info| {
            assert_eq!(info.local_apic_address, Some(0xFEE0_0000));
            Recording {
                state: &state,
                sent: &sent,
            }
        })
        .unwrap();

    assert_eq!(info.mem_lower_kib, 640);
    assert_eq!(info.mem_upper_kib, 64 * 1024);
    assert!(info.is_topology_resolved());

    let cpus: Vec<(u32, u32, u32)> = info
        .cpus()
        .iter()
        .map(|cpu| (cpu.apic_id, cpu.node_id, cpu.core_id))
        .collect();
    assert_eq!(cpus, [(0, 0, 0), (2, 0, 1)]);

    assert_eq!(info.num_nodes(), 1);
    assert_eq!(info.nodes()[0].id, 0);
    assert_eq!(info.nodes()[0].members(), &[0, 1]);

    assert_eq!(&low_memory[..TRAMPOLINE.len()], &TRAMPOLINE);
    assert_eq!(state.rendezvous().current(), 2);
    assert_eq!(state.boot_info(), Some(info));
    assert_eq!(sent.into_inner(), [Ipi::Init(2), Ipi::Startup(2)]);
}

#[test]
fn ipis_go_to_each_secondary_in_madt_order() {
    let (phys, rsdp) = firmware(
        &[
            Processor::enabled(6),
            Processor::enabled(2),
            Processor::disabled(8),
            Processor::enabled(4),
        ],
        &[],
    );
    let blob = MultibootBuilder::new().memory(640, 0).rsdp_v2(&rsdp).build();
    let mut low_memory = vec![0u8; 0x1000];

    let state = BootState::new();
    let sent = RefCell::new(Vec::new());
    let bsp = BootProcessor { apic_id: 6, ..BSP };
    let info = state
        .run(&phys, &blob, bsp, &TRAMPOLINE, &mut low_memory, |_| Recording {
            state: &state,
            sent: &sent,
        })
        .unwrap();

    let cpus: Vec<(u32, u32)> = info.cpus().iter().map(|cpu| (cpu.apic_id, cpu.core_id)).collect();
    assert_eq!(cpus, [(6, 3), (2, 1), (4, 2)]);
    assert_eq!(
        sent.into_inner(),
        [Ipi::Init(2), Ipi::Startup(2), Ipi::Init(4), Ipi::Startup(4)]
    );
}

#[test]
fn unknown_srat_processor_stops_boot_before_bring_up() {
    let (phys, rsdp) = firmware(&[Processor::enabled(0)], &[Affinity::enabled(1, 5)]);
    let blob = MultibootBuilder::new().memory(640, 0).rsdp_v2(&rsdp).build();
    let mut low_memory = vec![0u8; 0x1000];

    let state = BootState::new();
    let sent = RefCell::new(Vec::new());
    let result = state.run(&phys, &blob, BSP, &TRAMPOLINE, &mut low_memory, |_| Recording {
        state: &state,
        sent: &sent,
    });

    assert_eq!(
        result,
        Err(BootError::Topology(TopologyError::UnknownApicId { apic_id: 5 }))
    );
    assert!(low_memory.iter().all(|&b| b == 0));
    assert!(state.boot_info().is_none());
}

#[test]
fn trampoline_beyond_lower_memory_stops_boot() {
    let (phys, rsdp) = firmware(&[Processor::enabled(0), Processor::enabled(1)], &[]);
    let blob = MultibootBuilder::new().memory(4, 0).rsdp_v2(&rsdp).build();
    let mut low_memory = vec![0u8; 0x1000];

    let state = BootState::new();
    let sent = RefCell::new(Vec::new());
    let result = state.run(&phys, &blob, BSP, &TRAMPOLINE, &mut low_memory, |_| Recording {
        state: &state,
        sent: &sent,
    });

    assert_eq!(
        result,
        Err(BootError::Smp(SmpError::TrampolineTooLarge {
            code_size: TRAMPOLINE.len(),
            limit: 4 * 1024
        }))
    );
    assert_eq!(state.rendezvous().current(), 1);
    assert!(sent.into_inner().is_empty());
}
