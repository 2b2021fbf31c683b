//! # Kernel Tracing helpers

use kernel_info::BootInfo;
use log::info;

/// Logs the resolved boot information: memory, CPU records and node records.
pub fn trace_boot_info(boot_info: &BootInfo) {
    info!(
        concat!(
            "Boot Info in Kernel:\n",
            "  lower memory = {lower} KiB, upper memory = {upper} KiB\n",
            "  local APIC   = {lapic:#010x}\n",
            "  CPUs = {cpus}, NUMA nodes = {nodes}"
        ),
        lower = boot_info.mem_lower_kib,
        upper = boot_info.mem_upper_kib,
        lapic = boot_info.local_apic_address.unwrap_or_default(),
        cpus = boot_info.num_cpus(),
        nodes = boot_info.num_nodes(),
    );

    for (index, cpu) in boot_info.cpus().iter().enumerate() {
        info!(
            "  CPU {index}: APIC id {}, node {}, core {}",
            cpu.apic_id, cpu.node_id, cpu.core_id
        );
    }
    for node in boot_info.nodes() {
        info!("  Node {}: CPUs {:?}", node.id, node.members());
    }
}
