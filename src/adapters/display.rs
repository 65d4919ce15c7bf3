//! Display adapter.
//!
//! [`DisplayAdapter`] implements [`DisplayPort`] for the poll loop.  It keeps
//! a [`UiModel`] and, whenever the visible frame changes, publishes a copy
//! of it to the display worker through [`UI_SIGNAL`].  The worker only ever
//! sees the latest snapshot; intermediate frames are skipped.
//!
//! ```text
//! ┌──────────────┐  UiSnapshot (latest)  ┌────────────────┐
//! │  Poll loop   │──────────────────────▶│ Display worker │──▶ SSD1306
//! │ (setters)    │       Signal          │ (render_lines) │
//! └──────────────┘                       └────────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::adapters::time::Esp32TimeAdapter;
use crate::app::ports::{DisplayPort, MonotonicClock};
use crate::drivers::oled::Oled;
use crate::ui::{Line, UiModel, UiSnapshot, UiState, VolumeAction, render_lines};

/// Latest frame for the display worker.
pub static UI_SIGNAL: Signal<CriticalSectionRawMutex, UiSnapshot> = Signal::new();

/// Frame poll period of the display worker.
const DISPLAY_REFRESH_MS: u64 = 100;

pub struct DisplayAdapter<C> {
    model: UiModel,
    clock: C,
    published: Option<UiSnapshot>,
    signal: &'static Signal<CriticalSectionRawMutex, UiSnapshot>,
}

impl<C: MonotonicClock> DisplayAdapter<C> {
    /// Adapter publishing to [`UI_SIGNAL`].
    pub fn new(clock: C) -> Self {
        Self::with_signal(clock, &UI_SIGNAL)
    }

    pub fn with_signal(clock: C, signal: &'static Signal<CriticalSectionRawMutex, UiSnapshot>) -> Self {
        Self {
            model: UiModel::new(),
            clock,
            published: None,
            signal,
        }
    }

    /// Current frame, with expired screens already reverted to main.
    pub fn snapshot(&mut self) -> UiSnapshot {
        let now = self.clock.now_ms();
        self.model.snapshot(now)
    }

    /// Republish if the frame changed.  Called once per tick so that a
    /// screen timing out reaches the panel without another setter call.
    pub fn refresh(&mut self) {
        let snap = self.snapshot();
        if self.published != Some(snap) {
            self.signal.signal(snap);
            self.published = Some(snap);
        }
    }
}

impl<C: MonotonicClock> DisplayPort for DisplayAdapter<C> {
    fn set_desk_context(&mut self, height_cm: Option<f32>, moving: bool, moving_up: bool) {
        self.model.set_desk(height_cm, moving, moving_up);
        self.refresh();
    }

    fn set_ui_state(&mut self, state: UiState, duration_ms: u32) {
        let now = self.clock.now_ms();
        self.model.set_state(state, duration_ms, now);
        self.refresh();
    }

    fn set_fan_context(&mut self, percent: u8, active: bool) {
        let ctx = self.model.context_mut();
        ctx.fan_percent = percent;
        ctx.fan_active = active;
        self.refresh();
    }

    fn set_hue_context(&mut self, brightness_percent: u8, lights_on: bool) {
        let ctx = self.model.context_mut();
        ctx.hue_brightness_percent = brightness_percent;
        ctx.hue_on = lights_on;
        self.refresh();
    }

    fn set_volume_context(&mut self, action: VolumeAction) {
        self.model.context_mut().volume = Some(action);
        self.refresh();
    }

    fn set_window_context(&mut self, opening: bool) {
        self.model.context_mut().window_opening = Some(opening);
        self.refresh();
    }
}

/// Draw frames forever.  Runs on the protocol core.
///
/// Redraws when a new snapshot arrives or the minute on the main screen
/// rolls over.  A frame the panel refused is retried on the next pass.
pub fn run_display_worker<I: I2c>(time: Esp32TimeAdapter, mut panel: Oled<I>) -> ! {
    info!("Display worker started");
    let mut frame: Option<UiSnapshot> = None;
    let mut drawn: Option<[Line; 4]> = None;
    let mut panel_ok = true;
    loop {
        if let Some(snap) = UI_SIGNAL.try_take() {
            frame = Some(snap);
        }
        if let Some(snap) = frame {
            let clock = time.formatted_time();
            let lines = render_lines(&snap, clock.as_deref());
            if drawn.as_ref() != Some(&lines) {
                match panel.draw(&lines) {
                    Ok(()) => {
                        if !panel_ok {
                            info!("Display: panel back");
                        }
                        panel_ok = true;
                        drawn = Some(lines);
                    }
                    Err(e) => {
                        if panel_ok {
                            warn!("Display: {e}, retrying");
                        }
                        panel_ok = false;
                    }
                }
            }
        }
        std::thread::sleep(std::time::Duration::from_millis(DISPLAY_REFRESH_MS));
    }
}
