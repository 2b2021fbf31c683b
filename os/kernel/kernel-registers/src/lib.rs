//! # Typed `X86_64` Registers
//!
//! Layouts of the local APIC registers the bring-up path touches, plus raw
//! model-specific register access.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod apic_base;
pub mod icr;
pub mod msr;

pub use apic_base::ApicBase;
pub use icr::{DeliveryMode, DestinationShorthand, Icr};
pub use msr::Msr;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn store_unsafe(self);
}
