//! `critical-section` 1.x implementation for the ESP-IDF runtime.
//!
//! The network queue and the UI signal are embassy-sync primitives over
//! `CriticalSectionRawMutex`; on the device the acquire/release pair below
//! backs them with a FreeRTOS-aware std mutex.  Host builds link the
//! `critical-section/std` implementation instead.

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};
#[cfg(target_os = "espidf")]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(target_os = "espidf")]
static CS_MUTEX: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static CS_DEPTH: Cell<u8> = const { Cell::new(0) };
    static CS_GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

/// Take the section; nested calls on the same thread only bump the depth.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    CS_DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            // Nothing panics while the section is held, so a poisoned lock
            // still guards consistent data.
            let lock = CS_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
            CS_GUARD.with(|guard| *guard.borrow_mut() = Some(lock));
        }
        let next = d.saturating_add(1);
        depth.set(next);
        next
    })
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    CS_DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            return;
        }
        depth.set(d - 1);
        if d == 1 {
            CS_GUARD.with(|guard| *guard.borrow_mut() = None);
        }
    });
}
