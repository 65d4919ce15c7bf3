//! Commands into and out of the application service.
//!
//! [`AppCommand`] is what a console key (or an external caller) asks the
//! [`AppService`](super::service::AppService) to do.  [`NetCommand`] is
//! the copy the service hands to the network worker.

/// Actions the application core can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Start raising the desk (same as pressing the UP key).
    DeskUp,
    /// Start lowering the desk.
    DeskDown,
    /// Stop the desk in any direction.
    DeskStop,

    SkylightUp,
    SkylightDown,

    /// Switch the Hue group on if it is off, off if it is on.
    HueToggle,
    /// Recall scene `0..HUE_SCENE_COUNT`.
    HueScene(u8),
    HueBrighter,
    HueDimmer,

    VolumeUp,
    VolumeDown,
    Mute,
    /// Put the attached computer to sleep.
    Sleep,
}

/// Outbound HTTP request kinds, resolved to URLs by the network adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetCommand {
    SkylightUp,
    SkylightDown,
    /// Switch the configured Hue group on or off.
    HueSetOn(bool),
    /// Absolute group brightness, 0-254.
    HueBrightness(u8),
    /// Index into the configured scene ids.
    HueScene(u8),
}
