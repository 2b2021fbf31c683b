//! # Topology Resolution
//!
//! Reconciles the MADT-ordered CPU list with the SRAT-derived node membership.
//! The SRAT names processors by APIC id; once resolved, node members name
//! processors by their index in [`BootInfo::cpus`] and every CPU record knows
//! its node.

use crate::boot::{BootInfo, CpuInfo};
use log::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// The SRAT names a processor the MADT never listed.
    #[error("SRAT references APIC id {apic_id}, which the MADT does not list")]
    UnknownApicId { apic_id: u32 },
}

impl BootInfo {
    /// Rewrites node members from APIC ids to CPU indices and fills each CPU's
    /// `node_id`.
    ///
    /// All-or-nothing: every member is checked before anything is written, so on
    /// error neither CPU nor node records have changed. Calling this again after
    /// a successful resolution does nothing.
    ///
    /// # Errors
    /// [`TopologyError::UnknownApicId`] if a node member has no CPU record.
    pub fn resolve_topology(&mut self) -> Result<(), TopologyError> {
        if self.is_topology_resolved() {
            return Ok(());
        }

        for node in self.nodes() {
            for &apic_id in node.members() {
                if self.cpu_index(apic_id).is_none() {
                    return Err(TopologyError::UnknownApicId { apic_id });
                }
            }
        }

        let (cpus, nodes) = self.split_topology();
        for node in nodes {
            let node_id = node.id;
            for member in node.members_mut() {
                if let Some(index) = position(cpus, *member) {
                    cpus[index].node_id = node_id;
                    *member = u32::try_from(index).unwrap_or(u32::MAX);
                }
            }
            debug!("NUMA node {node_id}: CPUs {:?}", node.members());
        }

        self.mark_topology_resolved();
        Ok(())
    }
}

fn position(cpus: &[CpuInfo], apic_id: u32) -> Option<usize> {
    cpus.iter().position(|cpu| cpu.apic_id == apic_id)
}

/// Extracts the core id from an APIC id.
///
/// The APIC id is laid out as `[package | core | thread]`; `thread_bits` and
/// `core_bits` are the widths the platform reports for the two low fields.
/// Widths of 32 or more saturate instead of overflowing the shift.
#[must_use]
pub const fn derive_core_id(apic_id: u32, thread_bits: u32, core_bits: u32) -> u32 {
    let shifted = if thread_bits >= u32::BITS {
        0
    } else {
        apic_id >> thread_bits
    };
    let mask = if core_bits >= u32::BITS {
        u32::MAX
    } else {
        !(u32::MAX << core_bits)
    };
    shifted & mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cpus_one_node() -> BootInfo {
        let mut info = BootInfo::new();
        assert!(info.push_cpu(0).is_inserted());
        assert!(info.push_cpu(2).is_inserted());
        assert!(info.add_node_member(0, 0).is_inserted());
        assert!(info.add_node_member(0, 2).is_inserted());
        info
    }

    #[test]
    fn members_become_cpu_indices() {
        let mut info = two_cpus_one_node();
        info.resolve_topology().unwrap();

        assert_eq!(info.nodes()[0].members(), &[0, 1]);
        assert!(info.cpus().iter().all(|cpu| cpu.node_id == 0));
        assert!(info.is_topology_resolved());
    }

    #[test]
    fn cpus_learn_their_node() {
        let mut info = BootInfo::new();
        for apic_id in [0, 1, 4, 5] {
            assert!(info.push_cpu(apic_id).is_inserted());
        }
        assert!(info.add_node_member(3, 4).is_inserted());
        assert!(info.add_node_member(3, 5).is_inserted());
        assert!(info.add_node_member(1, 0).is_inserted());
        assert!(info.add_node_member(1, 1).is_inserted());

        info.resolve_topology().unwrap();

        let nodes: std::vec::Vec<u32> = info.cpus().iter().map(|cpu| cpu.node_id).collect();
        assert_eq!(nodes, [1, 1, 3, 3]);
        assert_eq!(info.nodes()[0].members(), &[2, 3]);
        assert_eq!(info.nodes()[1].members(), &[0, 1]);
    }

    #[test]
    fn unknown_apic_id_fails_without_mutation() {
        let mut info = BootInfo::new();
        assert!(info.push_cpu(0).is_inserted());
        assert!(info.push_cpu(2).is_inserted());
        assert!(info.add_node_member(5, 0).is_inserted());
        assert!(info.add_node_member(6, 7).is_inserted());
        let before = info.clone();

        assert_eq!(
            info.resolve_topology(),
            Err(TopologyError::UnknownApicId { apic_id: 7 })
        );
        assert_eq!(info, before);
        assert_eq!(info.cpus()[0].node_id, 0);
    }

    #[test]
    fn resolving_twice_is_a_no_op() {
        let mut info = two_cpus_one_node();
        info.resolve_topology().unwrap();
        let once = info.clone();
        info.resolve_topology().unwrap();
        assert_eq!(info, once);
    }

    #[test]
    fn core_id_skips_thread_bits_and_masks_core_bits() {
        // package 1, core 3, thread 1 with 1 thread bit and 2 core bits
        let apic_id = 0b1111;
        assert_eq!(derive_core_id(apic_id, 1, 2), 0b11);
        assert_eq!(derive_core_id(apic_id, 0, 0), 0);
        assert_eq!(derive_core_id(apic_id, 0, 32), apic_id);
        assert_eq!(derive_core_id(apic_id, 32, 4), 0);
        assert_eq!(derive_core_id(u32::MAX, 4, 4), 0xF);
    }
}
