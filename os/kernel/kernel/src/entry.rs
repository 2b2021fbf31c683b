use kernel::boot::{BootProcessor, BootState};
use kernel_acpi::PhysMapRo;
use kernel_info::BootInfo;
use kernel_info::memory::{AP_TRAMPOLINE_ADDR, REAL_MODE_LIMIT};
use kernel_qemu::{QemuLogger, qemu_trace};
use log::{LevelFilter, error, info};

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;
#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

static LOGGER: QemuLogger = QemuLogger::new(LOG_LEVEL);
static STATE: BootState = BootState::new();

unsafe extern "C" {
    /// First byte of the secondary-processor trampoline (linked into the image).
    static ap_init_start: u8;
    /// One past the last byte of the trampoline.
    static ap_init_end: u8;

    fn nf_main(argc: i32, argv: *const *const u8) -> i32;
}

/// Physical memory is identity mapped during early boot.
struct IdentityMap;

impl PhysMapRo for IdentityMap {
    fn map_ro(&self, paddr: u64, len: usize) -> Option<&[u8]> {
        let address = usize::try_from(paddr).ok().filter(|&a| a != 0)?;
        address.checked_add(len)?;
        // SAFETY: identity mapped and readable for the whole of early boot.
        Some(unsafe { core::slice::from_raw_parts(address as *const u8, len) })
    }
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    error!("{info}");
    halt()
}

/// Boot processor entry, called by the boot stub.
///
/// # ABI
/// C ABI: `multiboot` is the Multiboot2 information pointer the loader left
/// in `EBX`; the remaining arguments identify the boot processor (APIC id and
/// the topology field widths from CPUID).
#[unsafe(no_mangle)]
pub extern "C" fn kernel_main(
    multiboot: *const u8,
    apic_id: u32,
    thread_bits: u32,
    core_bits: u32,
) -> ! {
    if LOGGER.install().is_err() {
        qemu_trace!("Logger already installed\n");
    }
    info!("Kernel reporting on APIC id {apic_id}");

    // SAFETY: pointers and regions provided by the loader and the linker.
    let (blob, trampoline, low_memory) =
        unsafe { (multiboot_info(multiboot), trampoline_code(), low_memory()) };
    let bsp = BootProcessor {
        apic_id,
        thread_bits,
        core_bits,
    };

    match STATE.run(&IdentityMap, blob, bsp, trampoline, low_memory, connect_ipi) {
        Ok(boot_info) => {
            info!("Handing {} CPUs over to nf_main", boot_info.num_cpus());
            // SAFETY: external entry point; the boot information is published.
            let status = unsafe { nf_main(0, core::ptr::null()) };
            info!("nf_main returned {status}");
        }
        Err(e) => error!("Boot failed: {e}"),
    }
    halt()
}

/// Secondary processor entry, called by the trampoline.
#[unsafe(no_mangle)]
pub extern "C" fn ap_main(apic_id: u32, thread_bits: u32, core_bits: u32) -> ! {
    // SAFETY: each secondary runs this once, while the boot processor waits for it.
    if unsafe { STATE.check_in(apic_id, thread_bits, core_bits) }.is_none() {
        error!("APIC id {apic_id} could not check in");
    }
    halt()
}

#[cfg(feature = "x2apic")]
fn connect_ipi(_: &BootInfo) -> kernel_smp::X2Apic {
    // SAFETY: ring 0; x2APIC support is required for this build.
    unsafe { kernel_smp::X2Apic::enable() }
}

#[cfg(not(feature = "x2apic"))]
fn connect_ipi(boot_info: &BootInfo) -> kernel_smp::XApic {
    use core::ptr::NonNull;
    use kernel_info::memory::XAPIC_BASE_ADDRESS;

    let base = boot_info
        .local_apic_address
        .map_or(XAPIC_BASE_ADDRESS, u64::from);
    let Some(regs) = NonNull::new(base as *mut u32) else {
        error!("No local APIC register page");
        halt()
    };
    // SAFETY: the register page is identity mapped and uncached.
    unsafe { kernel_smp::XApic::new(regs) }
}

/// The Multiboot2 information, sized by its own `total_size` field.
unsafe fn multiboot_info<'a>(ptr: *const u8) -> &'a [u8] {
    if ptr.is_null() {
        return &[];
    }
    let total_size = unsafe { ptr.cast::<u32>().read_unaligned() };
    let len = usize::try_from(total_size).unwrap_or_default();
    unsafe { core::slice::from_raw_parts(ptr, len) }
}

unsafe fn trampoline_code() -> &'static [u8] {
    let start = &raw const ap_init_start;
    let end = &raw const ap_init_end;
    let len = (end as usize).saturating_sub(start as usize);
    unsafe { core::slice::from_raw_parts(start, len) }
}

/// Conventional memory from the trampoline address up to 1 MiB.
unsafe fn low_memory() -> &'static mut [u8] {
    let len = usize::try_from(REAL_MODE_LIMIT - AP_TRAMPOLINE_ADDR).unwrap_or_default();
    unsafe { core::slice::from_raw_parts_mut(AP_TRAMPOLINE_ADDR as *mut u8, len) }
}

fn halt() -> ! {
    loop {
        // SAFETY: parks the processor; nothing is expected to wake it.
        unsafe { core::arch::asm!("cli", "hlt", options(nomem, nostack)) };
    }
}
