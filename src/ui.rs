//! Console screen model.
//!
//! The poll loop only calls the setters on [`DisplayPort`]; this module
//! keeps what they set.  [`UiModel`] holds the screen currently shown and
//! how long it stays up before the main screen comes back, plus the context
//! each screen renders from.  [`render_lines`] lays a [`UiSnapshot`] out as
//! four text rows of a 128 px wide panel in the 8 px font.
//!
//! [`DisplayPort`]: crate::app::ports::DisplayPort

use core::fmt::Write;

use heapless::String;

/// Characters per text row.
pub const LINE_WIDTH: usize = 16;
/// Text rows per frame.
pub const LINE_COUNT: usize = 4;

pub type Line = String<LINE_WIDTH>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    /// Clock, height and fan summary.  Shown when nothing else is.
    Main,
    Desk,
    Volume,
    Hue,
    Window,
    Fan,
    Suspend,
    BootInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeAction {
    Up,
    Down,
    Mute,
}

/// Values the screens render from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UiContext {
    /// Last valid desk height.
    pub height_cm: Option<f32>,
    pub desk_moving: bool,
    pub desk_moving_up: bool,
    pub fan_percent: u8,
    pub fan_active: bool,
    pub hue_brightness_percent: u8,
    pub hue_on: bool,
    pub volume: Option<VolumeAction>,
    /// `Some(true)` while the skylight was last told to open.
    pub window_opening: Option<bool>,
}

/// Everything the display worker needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiSnapshot {
    pub state: UiState,
    pub ctx: UiContext,
}

pub struct UiModel {
    state: UiState,
    since_ms: u64,
    duration_ms: u32,
    ctx: UiContext,
}

impl Default for UiModel {
    fn default() -> Self {
        Self::new()
    }
}

impl UiModel {
    pub fn new() -> Self {
        Self {
            state: UiState::Main,
            since_ms: 0,
            duration_ms: 0,
            ctx: UiContext::default(),
        }
    }

    /// Show `state` from `now_ms` for `duration_ms`.
    pub fn set_state(&mut self, state: UiState, duration_ms: u32, now_ms: u64) {
        if state != self.state {
            log::debug!("UI: {:?} -> {:?} for {}ms", self.state, state, duration_ms);
        }
        self.state = state;
        self.since_ms = now_ms;
        self.duration_ms = duration_ms;
    }

    /// Current screen, falling back to main once the duration has passed.
    pub fn state(&mut self, now_ms: u64) -> UiState {
        if self.state != UiState::Main
            && now_ms.saturating_sub(self.since_ms) >= u64::from(self.duration_ms)
        {
            log::debug!("UI: {:?} expired, back to main", self.state);
            self.state = UiState::Main;
        }
        self.state
    }

    pub fn context(&self) -> &UiContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut UiContext {
        &mut self.ctx
    }

    pub fn set_desk(&mut self, height_cm: Option<f32>, moving: bool, moving_up: bool) {
        if height_cm.is_some() {
            self.ctx.height_cm = height_cm;
        }
        self.ctx.desk_moving = moving;
        self.ctx.desk_moving_up = moving_up;
    }

    pub fn snapshot(&mut self, now_ms: u64) -> UiSnapshot {
        UiSnapshot {
            state: self.state(now_ms),
            ctx: self.ctx,
        }
    }
}

fn line(args: core::fmt::Arguments<'_>) -> Line {
    let mut l = Line::new();
    // Overlong text is cut rather than wrapped.
    let _ = l.write_fmt(args);
    l
}

fn height_text(height_cm: Option<f32>) -> Line {
    match height_cm {
        Some(h) => line(format_args!(" {h:>3.0}cm")),
        None => line(format_args!(" ---cm")),
    }
}

/// Lay `snap` out as text rows.  `clock` is "HH:MM" once wall time is known.
pub fn render_lines(snap: &UiSnapshot, clock: Option<&str>) -> [Line; LINE_COUNT] {
    let c = &snap.ctx;
    match snap.state {
        UiState::Main => [
            line(format_args!(" {}", clock.unwrap_or("--:--"))),
            height_text(c.height_cm),
            if c.fan_active {
                line(format_args!(" Fan {:>3}%", c.fan_percent))
            } else {
                line(format_args!(" Fan off"))
            },
            line(format_args!(" Lights {}", if c.hue_on { "on" } else { "off" })),
        ],
        UiState::Desk => [
            if c.desk_moving {
                line(format_args!(" DESK {}", if c.desk_moving_up { "UP" } else { "DOWN" }))
            } else {
                line(format_args!(" DESK STOPPED"))
            },
            height_text(c.height_cm),
            Line::new(),
            line(format_args!(" {}", if c.desk_moving { "Moving..." } else { "Ready" })),
        ],
        UiState::Volume => [
            line(format_args!(" VOL")),
            line(format_args!(
                " {}",
                match c.volume {
                    Some(VolumeAction::Up) => "UP",
                    Some(VolumeAction::Down) => "DOWN",
                    Some(VolumeAction::Mute) => "MUTE",
                    None => "--",
                }
            )),
            Line::new(),
            Line::new(),
        ],
        UiState::Hue => [
            line(format_args!(" HUE")),
            line(format_args!(" {}", if c.hue_on { "ON" } else { "OFF" })),
            Line::new(),
            line(format_args!(" Bright {:>3}%", c.hue_brightness_percent)),
        ],
        UiState::Window => [
            line(format_args!(" WINDOW")),
            line(format_args!(
                " {}",
                match c.window_opening {
                    Some(true) => "opening",
                    Some(false) => "closing",
                    None => "idle",
                }
            )),
            Line::new(),
            line(format_args!(" Sending...")),
        ],
        UiState::Fan => [
            line(format_args!(" FAN")),
            if c.fan_active {
                line(format_args!(" {:>3}%", c.fan_percent))
            } else {
                line(format_args!(" OFF"))
            },
            Line::new(),
            fan_bar(c.fan_percent, c.fan_active),
        ],
        UiState::Suspend => [
            line(format_args!(" SUSPEND")),
            line(format_args!(" PC sleep")),
            Line::new(),
            Line::new(),
        ],
        UiState::BootInfo => [
            line(format_args!(" DESK CONSOLE")),
            line(format_args!(" v{}", env!("CARGO_PKG_VERSION"))),
            Line::new(),
            line(format_args!(" Starting...")),
        ],
    }
}

/// Bar of `#` across the row, proportional to `percent`.
fn fan_bar(percent: u8, active: bool) -> Line {
    let mut bar = Line::new();
    if !active {
        return bar;
    }
    let filled = usize::from(percent.min(100)) * LINE_WIDTH / 100;
    for i in 0..LINE_WIDTH {
        let _ = bar.push(if i < filled { '#' } else { '-' });
    }
    bar
}
