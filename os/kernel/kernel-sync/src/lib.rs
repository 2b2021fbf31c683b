//! # Kernel synchronization primitives
//!
//! Nothing here takes a lock. Early boot only needs two things shared
//! between processors: a counter the boot processor and each starting
//! secondary processor hand over control with ([`Rendezvous`]), and a cell
//! that publishes boot information once it is final ([`SyncOnceCell`]).

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod rendezvous;
mod sync_once_cell;

pub use rendezvous::Rendezvous;
pub use sync_once_cell::SyncOnceCell;
