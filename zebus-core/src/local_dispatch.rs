//! Local Dispatch Guard — per-thread toggle suppressing local
//! short-circuit delivery.

use std::cell::Cell;

thread_local! {
    static ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// True when a sender on the current thread is allowed to short-circuit
/// delivery to a locally-handled message instead of round-tripping
/// through the bus.
#[must_use]
pub fn is_enabled() -> bool {
    ENABLED.with(Cell::get)
}

/// Disable local short-circuiting on the current thread until the
/// returned guard is dropped, then restore the prior value rather than
/// unconditionally re-enabling — so nested disables compose correctly.
#[must_use]
pub fn disable() -> LocalDispatchGuard {
    let previous = ENABLED.with(|flag| flag.replace(false));
    LocalDispatchGuard { previous }
}

/// Scoped token returned by [`disable`]. Restores the prior per-thread
/// state on drop.
pub struct LocalDispatchGuard {
    previous: bool,
}

impl Drop for LocalDispatchGuard {
    fn drop(&mut self) {
        ENABLED.with(|flag| flag.set(self.previous));
    }
}
