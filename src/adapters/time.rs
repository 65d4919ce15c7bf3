//! ESP32 time adapter.
//!
//! Provides monotonic time and the wall-clock readout for the main screen.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side testing and simulation.

use core::fmt::Write;

use heapless::String;

use crate::app::ports::MonotonicClock;

/// Time adapter for the ESP32-S3 platform.
#[derive(Debug, Clone, Copy)]
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Seconds since boot (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.now_us() / 1_000_000
    }

    /// Local time as `HH:MM`.  `None` until SNTP has set the wall clock.
    pub fn formatted_time(&self) -> Option<String<5>> {
        let (hour, minute) = self.local_hour_minute()?;
        format_hh_mm(hour, minute)
    }

    #[cfg(target_os = "espidf")]
    fn local_hour_minute(&self) -> Option<(u8, u8)> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        // Reject obviously unsynced time (e.g. before 2020-01-01)
        const EPOCH_2020: i64 = 1_577_836_800;
        if i64::from(tv.tv_sec) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        let hour = u8::try_from(tm.tm_hour).ok()?;
        let minute = u8::try_from(tm.tm_min).ok()?;
        Some((hour, minute))
    }

    /// On non-ESP targets (simulation) the wall clock is never synced.
    #[cfg(not(target_os = "espidf"))]
    fn local_hour_minute(&self) -> Option<(u8, u8)> {
        None
    }
}

impl MonotonicClock for Esp32TimeAdapter {
    #[cfg(target_os = "espidf")]
    fn now_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

fn format_hh_mm(hour: u8, minute: u8) -> Option<String<5>> {
    if hour > 23 || minute > 59 {
        return None;
    }
    let mut s = String::new();
    write!(s, "{:02}:{:02}", hour, minute).ok()?;
    Some(s)
}
