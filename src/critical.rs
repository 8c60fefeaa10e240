//! Scoped suppression of preemption around memory and flash accesses.

/// Platform hook for masking and restoring interrupts.
pub trait CriticalSection {
    /// What `acquire` found, handed back to the matching `release`.
    type RestoreState: Copy;

    /// Mask preemption.
    fn acquire(&mut self) -> Self::RestoreState;

    /// Undo a matching [`CriticalSection::acquire`].
    fn release(&mut self, restore: Self::RestoreState);
}

/// Holds preemption masked until dropped, including on early `?` returns.
pub struct Guard<'a, C: CriticalSection> {
    cs: &'a mut C,
    restore: C::RestoreState,
}

impl<'a, C: CriticalSection> Guard<'a, C> {
    pub fn new(cs: &'a mut C) -> Self {
        let restore = cs.acquire();
        Self { cs, restore }
    }
}

impl<C: CriticalSection> Drop for Guard<'_, C> {
    fn drop(&mut self) {
        self.cs.release(self.restore);
    }
}

/// Run `f` with preemption masked.
pub fn with<C: CriticalSection, R>(cs: &mut C, f: impl FnOnce() -> R) -> R {
    let _guard = Guard::new(cs);
    f()
}

/// The process-wide critical section of the `critical-section` crate.
///
/// The firmware selects the implementation, for instance `cortex-m`'s
/// `critical-section-single-core` feature.
#[cfg(any(feature = "critical-section", test))]
pub struct Global;

#[cfg(any(feature = "critical-section", test))]
impl CriticalSection for Global {
    type RestoreState = critical_section::RestoreState;

    fn acquire(&mut self) -> Self::RestoreState {
        // SAFETY: every acquire is released by the `Guard` that made it, innermost first.
        unsafe { critical_section::acquire() }
    }

    fn release(&mut self, restore: Self::RestoreState) {
        // SAFETY: `restore` comes from the matching `acquire`.
        unsafe { critical_section::release(restore) }
    }
}
