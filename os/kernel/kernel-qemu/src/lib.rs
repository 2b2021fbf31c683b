//! # QEMU Debug Console
//!
//! Kernel output for runs under QEMU: every byte written to I/O port `0x402`
//! shows up on the host through `-debugcon`.
//!
//! ```text
//! log::info!(...)  ──▶  QemuLogger  ──▶  QemuSink (fmt::Write)  ──▶  out 0x402
//! qemu_trace!(...) ─────────────────────▶  QemuSink
//! ```
//!
//! ```bash
//! qemu-system-x86_64 -kernel kernel.bin -debugcon stdio
//! ```
//!
//! ## Features
//! * `enabled` (default): port output is compiled in. Without it every
//!   write is a no-op, so the logger can stay installed in builds that do
//!   not run under QEMU.
//!
//! ## Usage
//! ```rust,no_run
//! use kernel_qemu::QemuLogger;
//! use log::{LevelFilter, info};
//!
//! static LOGGER: QemuLogger = QemuLogger::new(LevelFilter::Info);
//!
//! LOGGER.install().expect("logger installed once");
//! info!("Booting");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::QemuLogger;

#[cfg(all(feature = "enabled", target_arch = "x86_64"))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    /// The port number for QEMU's debug port.
    const QEMU_DEBUG_PORT: u16 = 0x402;

    /// Write a single byte to QEMU's debug port.
    #[allow(clippy::inline_always)]
    #[inline(always)]
    pub fn dbg_putc(c: u8) {
        unsafe { outb(QEMU_DEBUG_PORT, c) }
    }

    #[allow(clippy::inline_always)]
    #[inline(always)]
    unsafe fn outb(port: u16, val: u8) {
        unsafe {
            core::arch::asm!(
            "out dx, al",
            in("dx") port,
            in("al") val,
            options(nomem, nostack, preserves_flags)
            );
        }
    }

    /// `fmt::Write` onto the debug port, byte by byte.
    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            s.bytes().for_each(dbg_putc);
            Ok(())
        }
    }

    #[doc(hidden)]
    #[inline]
    pub fn qemu_write(args: fmt::Arguments) {
        // Best-effort debug output.
        let _ = fmt::write(&mut QemuSink, args);
    }
}

#[cfg(not(all(feature = "enabled", target_arch = "x86_64")))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt;

    #[doc(hidden)]
    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub fn qemu_write(_: fmt::Arguments) {}
}

/// Writes `format!`-style output straight to the debug port, bypassing `log`.
#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
