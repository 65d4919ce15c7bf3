//! Fuzz target: `key_map`
//!
//! Builds arbitrary input events and checks that the key map never panics
//! and that desk commands only ever come from the two desk cells.
//!
//! cargo fuzz run fuzz_key_map

#![no_main]

use desk_console::app::commands::AppCommand;
use desk_console::app::service::key_map;
use desk_console::events::{EncoderId, InputEvent, Rotation, SwitchId};
use libfuzzer_sys::fuzz_target;

fn switch(kind: u8, a: u8, b: u8) -> SwitchId {
    match kind % 4 {
        0 => SwitchId::SingleRow(a),
        1 => SwitchId::Matrix { row: a, col: b },
        2 => SwitchId::DeskUp,
        _ => SwitchId::DeskDown,
    }
}

fuzz_target!(|data: &[u8]| {
    for chunk in data.chunks_exact(4) {
        let encoder = if chunk[1] & 1 == 0 { EncoderId::Volume } else { EncoderId::Hue };
        let rotation = if chunk[2] & 1 == 0 { Rotation::Clockwise } else { Rotation::CounterClockwise };
        let id = switch(chunk[1], chunk[2], chunk[3]);
        let event = match chunk[0] % 4 {
            0 => InputEvent::SwitchPressed(id),
            1 => InputEvent::SwitchReleased(id),
            2 => InputEvent::EncoderButtonPressed(encoder),
            _ => InputEvent::EncoderTurned(encoder, rotation),
        };

        let cmd = key_map(event);
        if matches!(cmd, Some(AppCommand::DeskUp | AppCommand::DeskDown | AppCommand::DeskStop)) {
            assert!(matches!(
                event,
                InputEvent::SwitchPressed(SwitchId::DeskUp | SwitchId::DeskDown)
            ));
        }
        if let Some(AppCommand::HueScene(i)) = cmd {
            assert!(i < 4);
        }
    }
});
