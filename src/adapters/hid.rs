//! USB HID adapter.
//!
//! Implements [`HidPort`] by encoding consumer-control and system-control
//! input reports into a bounded outbox.  Every key is a press report
//! followed by an all-zero release report with the same report id.
//!
//! | Report id | Payload        | Usages                               |
//! |-----------|----------------|--------------------------------------|
//! | 1         | u16 LE usage   | 0xE9 vol up, 0xEA vol down, 0xE2 mute|
//! | 2         | u8 usage       | 0x82 sleep, 0x83 wake                |
//!
//! The poll loop drains the outbox into a [`HidLink`] once per tick.  A
//! link that is busy (previous report still in flight, or the bus is
//! suspended) keeps the rest queued, so a press and its release always go
//! out as separate transfers and in order.

use heapless::{Deque, Vec};
use log::{info, warn};

use crate::app::ports::HidPort;

pub const CONSUMER_REPORT_ID: u8 = 1;
pub const SYSTEM_REPORT_ID: u8 = 2;

pub const USAGE_VOLUME_UP: u16 = 0x00E9;
pub const USAGE_VOLUME_DOWN: u16 = 0x00EA;
pub const USAGE_MUTE: u16 = 0x00E2;
pub const USAGE_SYSTEM_SLEEP: u8 = 0x82;
pub const USAGE_SYSTEM_WAKE: u8 = 0x83;

/// Report id plus at most two payload bytes.
pub type HidReport = Vec<u8, 3>;

/// The USB interrupt endpoint the reports leave through.
pub trait HidLink {
    /// `true` when the endpoint can take a report now.
    fn ready(&mut self) -> bool;

    /// Queue one input report.  `false` if the stack refused it.
    fn send(&mut self, report_id: u8, payload: &[u8]) -> bool;
}

const OUTBOX_DEPTH: usize = 16;

pub struct HidAdapter {
    outbox: Deque<HidReport, OUTBOX_DEPTH>,
    host_sleeping: bool,
    dropped: u32,
}

impl Default for HidAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HidAdapter {
    pub fn new() -> Self {
        Self {
            outbox: Deque::new(),
            host_sleeping: false,
            dropped: 0,
        }
    }

    /// Hand queued reports to `link`, oldest first, until it stops taking
    /// them.  Returns how many went out.
    pub fn flush(&mut self, link: &mut impl HidLink) -> usize {
        let mut sent = 0;
        while let Some(report) = self.outbox.front() {
            if !link.ready() {
                break;
            }
            let Some((&id, payload)) = report.split_first() else {
                self.outbox.pop_front();
                continue;
            };
            if !link.send(id, payload) {
                warn!("HID: report {id} refused, retrying next tick");
                break;
            }
            self.outbox.pop_front();
            sent += 1;
        }
        sent
    }

    /// Throw away everything queued.  For a console without a USB link.
    pub fn discard(&mut self) -> usize {
        let n = self.outbox.len();
        self.outbox.clear();
        n
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Keys lost because the host stopped polling the endpoint.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    fn consumer_key(&mut self, usage: u16) {
        let [lo, hi] = usage.to_le_bytes();
        self.press_release(&[CONSUMER_REPORT_ID, lo, hi], &[CONSUMER_REPORT_ID, 0, 0]);
    }

    fn press_release(&mut self, press: &[u8], release: &[u8]) {
        // Both reports or neither, so a key is never left held.
        if self.outbox.capacity() - self.outbox.len() < 2 {
            self.dropped = self.dropped.saturating_add(1);
            warn!("HID: outbox full, key dropped");
            return;
        }
        for bytes in [press, release] {
            let report = HidReport::from_slice(bytes).unwrap_or_default();
            // Room was checked above.
            let _ = self.outbox.push_back(report);
        }
    }
}

impl HidPort for HidAdapter {
    fn send_volume_up(&mut self) {
        self.consumer_key(USAGE_VOLUME_UP);
    }

    fn send_volume_down(&mut self) {
        self.consumer_key(USAGE_VOLUME_DOWN);
    }

    fn send_mute(&mut self) {
        self.consumer_key(USAGE_MUTE);
    }

    /// Alternates sleep and wake; the same key wakes the host again.
    fn send_sleep(&mut self) {
        let usage = if self.host_sleeping {
            USAGE_SYSTEM_WAKE
        } else {
            USAGE_SYSTEM_SLEEP
        };
        self.host_sleeping = !self.host_sleeping;
        info!("HID: system {}", if self.host_sleeping { "sleep" } else { "wake" });
        self.press_release(&[SYSTEM_REPORT_ID, usage], &[SYSTEM_REPORT_ID, 0]);
    }
}
