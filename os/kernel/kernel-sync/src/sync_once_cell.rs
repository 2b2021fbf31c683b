use core::{
    cell::UnsafeCell,
    fmt,
    hint::spin_loop,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

/// A write-once cell that can live in a `static`.
///
/// The first [`set`](Self::set) or [`get_or_init`](Self::get_or_init) wins;
/// every later reader on any processor sees the same value.
pub struct SyncOnceCell<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for SyncOnceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncOnceCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// Returns `Some(&T)` once a value has been published.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.is_initialized() {
            // SAFETY: READY is stored only after the value is written.
            Some(unsafe { self.get_unchecked() })
        } else {
            None
        }
    }

    /// Publishes `value` if the cell is empty.
    ///
    /// # Errors
    /// Hands `value` back if the cell was already set or is being set.
    pub fn set(&self, value: T) -> Result<&T, T> {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(value);
        }

        // SAFETY: the WRITING state gives this thread exclusive access.
        unsafe { self.publish(value) };
        // SAFETY: just published.
        Ok(unsafe { self.get_unchecked() })
    }

    /// Initializes at most once and returns `&T`. Callers that lose the race
    /// spin until the winner has published.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        if let Some(v) = self.get() {
            return v;
        }

        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            // SAFETY: the WRITING state gives this thread exclusive access.
            unsafe { self.publish(init()) };
        } else {
            while !self.is_initialized() {
                spin_loop();
            }
        }

        // SAFETY: READY
        unsafe { self.get_unchecked() }
    }

    /// # Safety
    /// The caller must have moved the state from EMPTY to WRITING.
    unsafe fn publish(&self, value: T) {
        unsafe {
            (*self.value.get()).write(value);
        }
        self.state.store(READY, Ordering::Release);
    }

    /// # Safety
    /// The state must be READY.
    unsafe fn get_unchecked(&self) -> &T {
        unsafe { (*self.value.get()).assume_init_ref() }
    }
}

impl<T> Drop for SyncOnceCell<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == READY {
            // SAFETY: READY means initialized; `&mut self` means no readers.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SyncOnceCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("SyncOnceCell").field(value).finish(),
            None => f.write_str("SyncOnceCell(<unset>)"),
        }
    }
}

// SAFETY: shared after READY; initialization is single-writer.
unsafe impl<T: Sync + Send> Sync for SyncOnceCell<T> {}
unsafe impl<T: Send> Send for SyncOnceCell<T> {}
