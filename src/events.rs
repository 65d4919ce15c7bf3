//! Input events produced by one poll of the console's switches and encoders.
//!
//! The poller turns raw line levels into these discrete, typed events; the
//! application service maps them to desk motion and outbound actions.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GPIO levels  │────▶│   Poller     │────▶│  AppService  │
//! │ (every tick) │     │ (debounce,   │     │ (key map)    │
//! │              │     │  edge detect)│     │              │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

/// Upper bound on events from a single tick: 5 single-row, 6 matrix cells
/// (the two desk cells can only produce one edge each) and 2 per encoder.
pub const MAX_EVENTS_PER_TICK: usize = 24;

/// Ordered events of one tick.
pub type InputEvents = heapless::Vec<InputEvent, MAX_EVENTS_PER_TICK>;

/// Logical identity of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchId {
    /// Independent switch, 0-based from the left.
    SingleRow(u8),
    /// Ordinary matrix cell.
    Matrix { row: u8, col: u8 },
    /// Matrix cell (0, 0): hold to raise the desk.
    DeskUp,
    /// Matrix cell (1, 0): hold to lower the desk.
    DeskDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderId {
    /// Encoder 1, host volume.
    Volume,
    /// Encoder 2, Hue brightness.
    Hue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    /// Signed step applied to an encoder's accumulated value.
    pub fn step(self) -> i32 {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
        }
    }
}

/// A discrete input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    SwitchPressed(SwitchId),
    /// Only the momentary desk cells report releases.
    SwitchReleased(SwitchId),
    EncoderButtonPressed(EncoderId),
    EncoderTurned(EncoderId, Rotation),
}
