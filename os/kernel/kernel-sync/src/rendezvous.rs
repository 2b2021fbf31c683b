use core::hint::spin_loop;
use core::sync::atomic::{AtomicUsize, Ordering};

/// The bring-up handshake counter.
///
/// Holds the index of the next processor expected to check in. It starts at
/// 1 because the boot processor (index 0) is already running.
///
/// The protocol has exactly one writer per index:
///
/// ```text
/// boot processor                      secondary processor
/// --------------                      -------------------
/// write trampoline, send INIT/SIPI
/// wait_while_at(n)  ─────────┐        i = current()          (Acquire)
///                            │        write own slot i
///                            └──────  arrive()               (Release)
/// read slot n                         park
/// ```
///
/// The Release increment publishes the slot write; the boot processor's
/// Acquire load observes it before it moves on.
#[derive(Debug)]
pub struct Rendezvous {
    counter: AtomicUsize,
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}

impl Rendezvous {
    /// A counter at 1: only the boot processor is online.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicUsize::new(1),
        }
    }

    /// The index of the next processor to check in, which is also the
    /// number of processors online.
    #[inline]
    pub fn current(&self) -> usize {
        self.counter.load(Ordering::Acquire)
    }

    /// Signals that the processor at [`current`](Self::current) has finished
    /// writing its slot. Returns the index that checked in.
    ///
    /// Must be the last write a checking-in processor makes to shared state.
    #[inline]
    pub fn arrive(&self) -> usize {
        self.counter.fetch_add(1, Ordering::Release)
    }

    /// Spins until the counter no longer equals `index`.
    ///
    /// There is no timeout: a processor that never arrives stalls the caller.
    #[inline]
    pub fn wait_while_at(&self, index: usize) {
        while self.counter.load(Ordering::Acquire) == index {
            spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_processor_is_already_counted() {
        assert_eq!(Rendezvous::new().current(), 1);
        assert_eq!(Rendezvous::default().current(), 1);
    }

    #[test]
    fn arrive_returns_the_index_that_checked_in() {
        let r = Rendezvous::new();
        assert_eq!(r.arrive(), 1);
        assert_eq!(r.arrive(), 2);
        assert_eq!(r.current(), 3);
    }

    #[test]
    fn wait_returns_immediately_when_past_index() {
        let r = Rendezvous::new();
        r.arrive();
        r.wait_while_at(1);
        r.wait_while_at(7);
    }
}
