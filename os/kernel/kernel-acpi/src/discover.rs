//! Root pointer → root table → MADT/SRAT discovery.

use crate::madt::Madt;
use crate::rsdp::RootPointer;
use crate::sdt::{RootTable, Sdt, SdtHeader};
use crate::srat::Srat;
use crate::{AcpiError, PhysMapRo, Signature};
use kernel_info::{BootInfo, Insert};
use log::{debug, trace, warn};

/// What a discovery pass recorded.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Discovered {
    /// Valid MADTs applied.
    pub madt_tables: usize,
    /// Valid SRATs applied.
    pub srat_tables: usize,
    /// CPU records appended.
    pub cpus: usize,
    /// Node memberships recorded.
    pub affinities: usize,
    /// Enabled records dropped because a list was full.
    pub dropped: usize,
}

impl Discovered {
    const fn count(&mut self, outcome: Insert) -> bool {
        match outcome {
            Insert::Inserted => true,
            Insert::CapacityExceeded => {
                self.dropped += 1;
                false
            }
        }
    }
}

/// Discovers processors and NUMA affinity from the RSDP bytes handed over by
/// the boot loader, appending them to `info`.
///
/// Every root table entry is inspected in table order. A MADT or SRAT that
/// fails validation anywhere (checksum, truncated record) is skipped as a
/// whole; nothing from it is recorded.
///
/// # Errors
/// Any error validating the root pointer or the root table. `info` is left
/// untouched in that case.
pub fn try_parse_root_pointer<M: PhysMapRo>(
    map: &M,
    rsdp: &[u8],
    info: &mut BootInfo,
) -> Result<Discovered, AcpiError> {
    let pointer = RootPointer::parse(rsdp)?;
    let root = RootTable::load(map, pointer)?;
    debug!("ACPI root {} with {} entries", root.signature(), root.len());

    let mut found = Discovered::default();
    for address in root.entries() {
        let header = match SdtHeader::read(map, address) {
            Ok(header) => header,
            Err(err) => {
                warn!("Skipping ACPI table at {address:#x}: {err}");
                continue;
            }
        };

        let applied = match header.signature {
            Signature::MADT => Sdt::load(map, address)
                .and_then(|sdt| apply_madt(&sdt, info, &mut found)),
            Signature::SRAT => Sdt::load(map, address)
                .and_then(|sdt| apply_srat(&sdt, info, &mut found)),
            other => {
                trace!("Ignoring ACPI table {other} at {address:#x}");
                continue;
            }
        };

        if let Err(err) = applied {
            warn!("Skipping {} at {address:#x}: {err}", header.signature);
        }
    }

    Ok(found)
}

/// Like [`try_parse_root_pointer`], but never fails: a rejected root pointer
/// or root table is logged and `info` stays as it was.
pub fn parse_root_pointer<M: PhysMapRo>(map: &M, rsdp: &[u8], info: &mut BootInfo) {
    match try_parse_root_pointer(map, rsdp, info) {
        Ok(found) => debug!(
            "ACPI: {} MADT, {} SRAT, {} CPUs, {} affinities, {} dropped",
            found.madt_tables, found.srat_tables, found.cpus, found.affinities, found.dropped
        ),
        Err(err) => warn!("ACPI discovery aborted: {err}"),
    }
}

fn apply_madt(sdt: &Sdt<'_>, info: &mut BootInfo, found: &mut Discovered) -> Result<(), AcpiError> {
    let madt = Madt::parse(sdt)?;
    madt.entries().try_for_each(|entry| entry.map(drop))?;
    debug!(
        "MADT: local APIC at {:#x}, legacy PICs: {}",
        madt.local_apic_address,
        madt.has_legacy_pics()
    );

    info.local_apic_address = info.local_apic_address.or(Some(madt.local_apic_address));
    for apic in madt.enabled_processors().flatten() {
        if found.count(info.push_cpu(u32::from(apic.apic_id))) {
            found.cpus += 1;
        }
    }

    found.madt_tables += 1;
    Ok(())
}

fn apply_srat(sdt: &Sdt<'_>, info: &mut BootInfo, found: &mut Discovered) -> Result<(), AcpiError> {
    let srat = Srat::parse(sdt)?;
    srat.entries().try_for_each(|entry| entry.map(drop))?;

    for affinity in srat.enabled_processors().flatten() {
        let outcome = info.add_node_member(affinity.proximity_domain, u32::from(affinity.apic_id));
        if found.count(outcome) {
            found.affinities += 1;
        }
    }

    found.srat_tables += 1;
    Ok(())
}
