//! Runtime symbols the embassy crates link against.
//!
//! `embassy-sync` channels need a `critical-section` implementation and
//! the `async-io-mini` timers need an `embassy-time` driver.  On host both
//! come from the crates' `std` features; on ESP-IDF they are provided here:
//!
//! - critical section: one process-wide mutex, re-entrant per thread
//! - time driver: `esp_timer_get_time()` (µs, matching the 1 MHz tick) and
//!   a single alarm thread that wakes timers when their deadline passes

use core::task::Waker;

/// Pending timer wakeups, one entry per waker.
#[derive(Default)]
pub struct AlarmList {
    pending: Vec<(u64, Waker)>,
}

impl AlarmList {
    pub const fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Register `waker` for tick `at`.  A waker already waiting keeps the
    /// earlier of its two deadlines; the timer re-arms itself if woken early.
    pub fn schedule(&mut self, at: u64, waker: &Waker) {
        match self.pending.iter_mut().find(|(_, w)| w.will_wake(waker)) {
            Some(entry) => entry.0 = entry.0.min(at),
            None => self.pending.push((at, waker.clone())),
        }
    }

    /// Wake everything due at `now`.  Returns the next deadline, if any.
    pub fn expire(&mut self, now: u64) -> Option<u64> {
        let mut next = None::<u64>;
        self.pending.retain(|(at, waker)| {
            if *at <= now {
                waker.wake_by_ref();
                false
            } else {
                next = Some(next.map_or(*at, |n| n.min(*at)));
                true
            }
        });
        next
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Critical section
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod critical {
    use core::cell::{Cell, RefCell};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    static LOCK: Mutex<()> = Mutex::new(());

    thread_local! {
        static DEPTH: Cell<u8> = const { Cell::new(0) };
        static HELD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
    }

    struct EspCriticalSection;
    critical_section::set_impl!(EspCriticalSection);

    // SAFETY: the lock is held from the outermost acquire to the matching
    // release on the same thread; nested sections only bump the depth.
    unsafe impl critical_section::Impl for EspCriticalSection {
        unsafe fn acquire() -> critical_section::RawRestoreState {
            DEPTH.with(|depth| {
                if depth.get() == 0 {
                    let guard = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
                    HELD.with(|held| *held.borrow_mut() = Some(guard));
                }
                depth.set(depth.get().saturating_add(1));
            });
        }

        unsafe fn release(_restore: critical_section::RawRestoreState) {
            DEPTH.with(|depth| match depth.get() {
                0 => {}
                1 => {
                    depth.set(0);
                    HELD.with(|held| *held.borrow_mut() = None);
                }
                d => depth.set(d - 1),
            });
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Time driver
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod time_driver {
    use core::task::Waker;
    use core::time::Duration;
    use std::sync::{Condvar, Mutex, MutexGuard, Once, PoisonError};

    use log::error;

    use super::AlarmList;
    use crate::drivers::task_pin::{spawn_on_core, Core};

    static ALARMS: Mutex<AlarmList> = Mutex::new(AlarmList::new());
    static CHANGED: Condvar = Condvar::new();
    static STARTED: Once = Once::new();

    fn alarms() -> MutexGuard<'static, AlarmList> {
        ALARMS.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[unsafe(no_mangle)]
    fn _embassy_time_now() -> u64 {
        // SAFETY: esp_timer is started by the IDF before app_main.
        unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
    }

    #[unsafe(no_mangle)]
    fn _embassy_time_schedule_wake(at: u64, waker: &Waker) {
        STARTED.call_once(|| {
            if let Err(e) = spawn_on_core(Core::Any, 6, 4, "alarm\0", alarm_loop) {
                error!("TIMER: alarm thread spawn failed: {}", e);
            }
        });
        alarms().schedule(at, waker);
        CHANGED.notify_one();
    }

    fn alarm_loop() {
        let mut list = alarms();
        loop {
            let now = _embassy_time_now();
            list = match list.expire(now) {
                Some(next) => {
                    CHANGED
                        .wait_timeout(list, Duration::from_micros(next - now))
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => CHANGED.wait(list).unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}
