//! # Boot Information Model

use crate::memory::{MAX_CPUS, MAX_NODES};
use crate::topology::derive_core_id;
use heapless::Vec;
use log::warn;

/// Outcome of inserting into a fixed-capacity list.
#[must_use]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Insert {
    /// The record was stored.
    Inserted,
    /// The list was full; the record was dropped and nothing else changed.
    CapacityExceeded,
}

impl Insert {
    #[inline]
    #[must_use]
    pub const fn is_inserted(self) -> bool {
        matches!(self, Self::Inserted)
    }

    fn from_push<T>(result: &Result<(), T>) -> Self {
        if result.is_ok() {
            Self::Inserted
        } else {
            Self::CapacityExceeded
        }
    }
}

/// One logical processor.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CpuInfo {
    /// Local APIC id. MADT order until the processor checks in, then the
    /// id the processor reported about itself.
    pub apic_id: u32,

    /// NUMA node the processor belongs to. Filled by topology resolution.
    pub node_id: u32,

    /// Core id derived from the APIC id and the platform's topology bit widths.
    pub core_id: u32,
}

impl CpuInfo {
    #[must_use]
    pub const fn new(apic_id: u32) -> Self {
        Self {
            apic_id,
            node_id: 0,
            core_id: 0,
        }
    }

    /// Stores the identity a processor reports about itself.
    pub const fn identify(&mut self, apic_id: u32, thread_bits: u32, core_bits: u32) {
        self.apic_id = apic_id;
        self.core_id = derive_core_id(apic_id, thread_bits, core_bits);
    }
}

/// One NUMA node and the processors that belong to it.
///
/// Before topology resolution the members are raw APIC ids as listed by the
/// SRAT; afterwards they are indices into [`BootInfo::cpus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub id: u32,
    members: Vec<u32, MAX_CPUS>,
}

impl NodeInfo {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self {
            id,
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn members(&self) -> &[u32] {
        &self.members
    }

    pub fn push_member(&mut self, member: u32) -> Insert {
        Insert::from_push(&self.members.push(member))
    }

    pub(crate) fn members_mut(&mut self) -> &mut [u32] {
        &mut self.members
    }
}

/// Boot information collected on the boot processor.
///
/// Zero-initialized before parsing and never destroyed during the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootInfo {
    /// Lower memory size in KiB, as reported by the Multiboot2 memory tag.
    pub mem_lower_kib: u32,

    /// Upper memory size in KiB, as reported by the Multiboot2 memory tag.
    pub mem_upper_kib: u32,

    /// Local interrupt controller address from the first valid MADT.
    pub local_apic_address: Option<u32>,

    cpus: Vec<CpuInfo, MAX_CPUS>,
    nodes: Vec<NodeInfo, MAX_NODES>,
    topology_resolved: bool,
}

impl BootInfo {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mem_lower_kib: 0,
            mem_upper_kib: 0,
            local_apic_address: None,
            cpus: Vec::new(),
            nodes: Vec::new(),
            topology_resolved: false,
        }
    }

    /// CPU records in MADT discovery order.
    #[must_use]
    pub fn cpus(&self) -> &[CpuInfo] {
        &self.cpus
    }

    /// Mutable access to the populated CPU records; the count cannot change.
    pub fn cpus_mut(&mut self) -> &mut [CpuInfo] {
        &mut self.cpus
    }

    #[must_use]
    pub fn nodes(&self) -> &[NodeInfo] {
        &self.nodes
    }

    #[must_use]
    pub fn num_cpus(&self) -> usize {
        self.cpus.len()
    }

    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_topology_resolved(&self) -> bool {
        self.topology_resolved
    }

    pub(crate) const fn mark_topology_resolved(&mut self) {
        self.topology_resolved = true;
    }

    pub(crate) fn split_topology(&mut self) -> (&mut [CpuInfo], &mut [NodeInfo]) {
        (&mut self.cpus, &mut self.nodes)
    }

    /// Index of the CPU record carrying `apic_id`.
    #[must_use]
    pub fn cpu_index(&self, apic_id: u32) -> Option<usize> {
        self.cpus.iter().position(|cpu| cpu.apic_id == apic_id)
    }

    /// Appends a processor discovered in the MADT.
    pub fn push_cpu(&mut self, apic_id: u32) -> Insert {
        let outcome = Insert::from_push(&self.cpus.push(CpuInfo::new(apic_id)));
        if !outcome.is_inserted() {
            warn!("CPU list full ({MAX_CPUS} entries); dropping APIC id {apic_id}");
        }
        outcome
    }

    /// Records that `apic_id` belongs to NUMA node `node_id`, creating the node
    /// on first sight.
    pub fn add_node_member(&mut self, node_id: u32, apic_id: u32) -> Insert {
        let node = if let Some(index) = self.nodes.iter().position(|node| node.id == node_id) {
            &mut self.nodes[index]
        } else {
            if self.nodes.push(NodeInfo::new(node_id)).is_err() {
                warn!(
                    "NUMA node list full ({MAX_NODES} entries); dropping node {node_id} (APIC id {apic_id})"
                );
                return Insert::CapacityExceeded;
            }
            let last = self.nodes.len() - 1;
            &mut self.nodes[last]
        };

        let outcome = node.push_member(apic_id);
        if !outcome.is_inserted() {
            warn!("NUMA node {node_id} is full; dropping APIC id {apic_id}");
        }
        outcome
    }

    /// Writes the boot processor's own identity into slot 0.
    ///
    /// The boot processor always owns index 0, whatever the MADT listed first.
    pub fn record_boot_processor(
        &mut self,
        apic_id: u32,
        thread_bits: u32,
        core_bits: u32,
    ) -> Insert {
        if self.cpus.is_empty() {
            let outcome = self.push_cpu(apic_id);
            if !outcome.is_inserted() {
                return outcome;
            }
        }

        let bsp = &mut self.cpus[0];
        bsp.identify(apic_id, thread_bits, core_bits);
        Insert::Inserted
    }
}
