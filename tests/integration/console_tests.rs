//! End-to-end tests of the poll loop: mock lines in, relays, PWM, network
//! commands, HID keys and UI states out.

use desk_console::app::commands::{AppCommand, NetCommand};
use desk_console::app::events::{AppEvent, StopReason};
use desk_console::app::service::AppService;
use desk_console::config::ConsoleConfig;
use desk_console::desk::{Direction, MotionState};
use desk_console::drivers::relay::Relay;
use desk_console::events::EncoderId;
use desk_console::ui::{UiState, VolumeAction};

use super::mock_hw::{
    HidCall, MockBoard, RecordingHid, RecordingNet, RecordingSink, RecordingUi, SimRef, board_io,
    new_sim,
};

struct Rig {
    sim: SimRef,
    app: AppService<MockBoard>,
    ui: RecordingUi,
    net: RecordingNet,
    hid: RecordingHid,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        let sim = new_sim();
        let mut app = AppService::new(ConsoleConfig::default(), board_io(&sim));
        let mut ui = RecordingUi::default();
        let mut sink = RecordingSink::default();
        app.start(&mut ui, &mut sink);
        Self {
            sim,
            app,
            ui,
            net: RecordingNet::default(),
            hid: RecordingHid::default(),
            sink,
        }
    }

    /// Run one tick starting at `ms`.  A sonar wait inside the previous tick
    /// may already have carried the clock past `ms`; it never goes back.
    fn tick_at(&mut self, ms: u64) {
        {
            let mut s = self.sim.borrow_mut();
            s.now_us = s.now_us.max(ms * 1_000);
        }
        self.app
            .tick(&mut self.ui, &mut self.net, &mut self.hid, &mut self.sink);
    }

    fn command(&mut self, cmd: AppCommand) {
        self.app
            .handle_command(cmd, &mut self.ui, &mut self.net, &mut self.hid, &mut self.sink);
    }

    fn press_cell(&self, row: usize, col: usize, pressed: bool) {
        self.sim.borrow_mut().matrix_pressed[row][col] = pressed;
    }

    fn press_single(&self, i: usize, pressed: bool) {
        self.sim.borrow_mut().single_pressed[i] = pressed;
    }

    /// Relays are active-low on this board.
    fn relay_closed(&self, relay: Relay) -> bool {
        let s = self.sim.borrow();
        match relay {
            Relay::Up => !s.relay_up_high,
            Relay::Down => !s.relay_down_high,
        }
    }
}

// ── Desk motion ───────────────────────────────────────────────

#[test]
fn boots_idle_with_relays_open() {
    let rig = Rig::new();
    assert_eq!(rig.app.desk_state(), MotionState::Idle);
    assert!(!rig.relay_closed(Relay::Up));
    assert!(!rig.relay_closed(Relay::Down));
    assert_eq!(rig.ui.last_state(), Some(UiState::BootInfo));
    assert!(matches!(rig.sink.events.first(), Some(AppEvent::Started)));
}

#[test]
fn desk_up_key_starts_motion_at_tick_time() {
    let mut rig = Rig::new();
    rig.press_cell(0, 0, true);
    rig.tick_at(1_000);

    assert_eq!(rig.app.desk_state(), MotionState::MovingUp { since_ms: 1_000 });
    assert!(rig.relay_closed(Relay::Up));
    assert!(!rig.relay_closed(Relay::Down));
    assert!(rig.app.relay_energized(Relay::Up));
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::DeskMoving {
            direction: Direction::Up,
            since_ms: 1_000
        }
    )));
    assert!(rig.ui.states.contains(&(UiState::Desk, 10_000)));
}

#[test]
fn releasing_desk_key_stops() {
    let mut rig = Rig::new();
    rig.press_cell(1, 0, true);
    rig.tick_at(1_000);
    assert_eq!(rig.app.desk_state(), MotionState::MovingDown { since_ms: 1_000 });

    rig.press_cell(1, 0, false);
    rig.tick_at(1_400);

    assert_eq!(rig.app.desk_state(), MotionState::Idle);
    assert!(!rig.relay_closed(Relay::Down));
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::DeskStopped {
            reason: StopReason::Released,
            moved_ms: 400
        }
    )));
}

#[test]
fn held_key_is_cut_after_movement_limit_exactly_once() {
    let mut rig = Rig::new();
    rig.press_cell(0, 0, true);
    rig.tick_at(1_000);
    assert!(rig.relay_closed(Relay::Up));

    // Keep holding for 11 s of ticks.
    for k in 1..=20 {
        rig.tick_at(1_000 + 550 * k);
    }

    assert_eq!(rig.app.desk_state(), MotionState::Idle);
    assert!(!rig.relay_closed(Relay::Up));
    assert!(!rig.relay_closed(Relay::Down));
    assert_eq!(rig.sink.emergency_stops(), 1);
    assert_eq!(rig.app.emergency_stops(), 1);

    // Still holding: the key must not restart the desk.
    let starts = rig
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::DeskMoving { .. }))
        .count();
    assert_eq!(starts, 1);
}

#[test]
fn movement_within_limit_is_not_cut() {
    let mut rig = Rig::new();
    rig.press_cell(0, 0, true);
    rig.tick_at(1_000);
    for k in 1..=9 {
        rig.tick_at(1_000 + 1_000 * k);
    }
    assert_eq!(rig.app.desk_state(), MotionState::MovingUp { since_ms: 1_000 });
    assert_eq!(rig.sink.emergency_stops(), 0);
}

#[test]
fn both_desk_keys_never_close_both_relays() {
    let mut rig = Rig::new();
    rig.press_cell(0, 0, true);
    rig.press_cell(1, 0, true);
    rig.tick_at(1_000);

    // Row 1 is scanned after row 0, so DOWN wins.
    assert_eq!(rig.app.desk_state(), MotionState::MovingDown { since_ms: 1_000 });

    let writes = rig.sim.borrow().relay_writes.clone();
    let (mut up_closed, mut down_closed) = (false, false);
    for (is_up, high) in writes {
        if is_up {
            up_closed = !high;
        } else {
            down_closed = !high;
        }
        assert!(!(up_closed && down_closed), "both relays closed at once");
    }
}

#[test]
fn external_stop_command_stops_motion() {
    let mut rig = Rig::new();
    rig.tick_at(500);
    rig.command(AppCommand::DeskUp);
    assert_eq!(rig.app.desk_state().direction(), Some(Direction::Up));

    rig.command(AppCommand::DeskStop);
    assert_eq!(rig.app.desk_state(), MotionState::Idle);
    assert!(!rig.relay_closed(Relay::Up));
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::DeskStopped {
            reason: StopReason::Command,
            ..
        }
    )));
}

// ── Matrix scanning ───────────────────────────────────────────

#[test]
fn matrix_drives_one_row_at_a_time() {
    let mut rig = Rig::new();
    rig.press_cell(0, 1, true);
    rig.press_cell(1, 2, true);
    rig.tick_at(1_000);
    rig.tick_at(1_200);

    let s = rig.sim.borrow();
    let mut high = [true; 2];
    let mut drives = 0;
    for &(row, level) in &s.row_writes {
        high[row] = level;
        if !level {
            drives += 1;
        }
        assert!(high[0] || high[1], "two rows active at once");
    }
    assert_eq!(drives, 4, "each row driven once per tick");
    assert_eq!(s.row_high, [true, true], "rows parked inactive between scans");
}

#[test]
fn second_row_press_is_not_read_on_first_row() {
    let mut rig = Rig::new();
    rig.press_cell(1, 1, true);
    rig.tick_at(1_000);

    assert_eq!(rig.net.sent, vec![NetCommand::SkylightDown]);
}

#[test]
fn desk_down_cell_does_not_move_desk_up() {
    let mut rig = Rig::new();
    rig.press_cell(1, 0, true);
    rig.tick_at(1_000);

    assert!(!rig.relay_closed(Relay::Up));
    assert!(rig.relay_closed(Relay::Down));
}

#[test]
fn matrix_cells_reach_their_collaborators() {
    let mut rig = Rig::new();
    rig.press_cell(0, 1, true);
    rig.press_cell(1, 2, true);
    rig.tick_at(1_000);

    assert_eq!(rig.net.sent, vec![NetCommand::SkylightUp]);
    assert_eq!(rig.ui.window, Some(true));
    assert_eq!(rig.hid.calls, vec![HidCall::Sleep]);
    assert_eq!(rig.ui.last_state(), Some(UiState::Suspend));
}

// ── Single-row switches ───────────────────────────────────────

#[test]
fn scene_keys_and_mute() {
    let mut rig = Rig::new();
    rig.press_single(2, true);
    rig.press_single(4, true);
    rig.tick_at(1_000);

    assert_eq!(rig.net.sent, vec![NetCommand::HueScene(2)]);
    assert!(rig.app.hue_state().1);
    assert_eq!(rig.hid.calls, vec![HidCall::Mute]);
    assert_eq!(rig.ui.volume, Some(VolumeAction::Mute));
}

#[test]
fn held_switch_repeats_after_debounce_window() {
    let mut rig = Rig::new();
    rig.press_single(0, true);
    rig.tick_at(1_000);
    rig.tick_at(1_100);
    rig.tick_at(1_200);

    assert_eq!(rig.net.sent, vec![NetCommand::HueScene(0), NetCommand::HueScene(0)]);
}

// ── Encoders ──────────────────────────────────────────────────

#[test]
fn hue_encoder_steps_brightness() {
    let mut rig = Rig::new();
    rig.tick_at(1_000);

    // CLK falls while DT is high: clockwise.
    rig.sim.borrow_mut().encoder_lines[1] = [false, true, true];
    rig.tick_at(1_010);

    assert_eq!(rig.net.sent, vec![NetCommand::HueBrightness(116)]);
    assert_eq!(rig.app.hue_state().0, 116);
    assert_eq!(rig.app.encoder_value(EncoderId::Hue), 1);
    assert_eq!(rig.ui.last_state(), Some(UiState::Hue));
}

#[test]
fn volume_encoder_counter_clockwise_sends_volume_down() {
    let mut rig = Rig::new();
    rig.tick_at(1_000);

    rig.sim.borrow_mut().encoder_lines[0] = [false, false, true];
    rig.tick_at(1_010);
    // CLK back high: no event on a rising edge.
    rig.sim.borrow_mut().encoder_lines[0] = [true, false, true];
    rig.tick_at(1_020);

    assert_eq!(rig.hid.calls, vec![HidCall::VolumeDown]);
    assert_eq!(rig.app.encoder_value(EncoderId::Volume), -1);
    assert_eq!(rig.ui.volume, Some(VolumeAction::Down));
}

#[test]
fn encoder_button_toggles_lights() {
    let mut rig = Rig::new();
    rig.sim.borrow_mut().encoder_lines[1][2] = false;
    rig.tick_at(1_000);

    assert_eq!(rig.net.sent, vec![NetCommand::HueSetOn(true)]);
    assert_eq!(rig.ui.hue, Some((39, true)));
}

// ── Network queue ─────────────────────────────────────────────

#[test]
fn refused_network_command_is_reported_and_not_applied() {
    let mut rig = Rig::new();
    rig.net.accept = false;
    rig.command(AppCommand::HueToggle);

    assert!(!rig.app.hue_state().1);
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::NetworkCommandDropped(NetCommand::HueSetOn(true))
    )));
}

// ── Height ────────────────────────────────────────────────────

#[test]
fn height_is_distance_plus_offset() {
    let mut rig = Rig::new();
    rig.sim.borrow_mut().sonar_cm = Some(82.0);
    rig.tick_at(1_000);

    let h = rig.app.desk_height_cm().expect("height measured");
    assert!((h - 112.0).abs() < 1.0, "got {h}");
    assert!(rig.ui.desk.iter().any(|(h, _, _)| h.is_some()));
}

#[test]
fn sonar_timeout_keeps_last_height() {
    let mut rig = Rig::new();
    rig.sim.borrow_mut().sonar_cm = Some(82.0);
    rig.tick_at(1_000);
    let first = rig.app.desk_height_cm();

    rig.sim.borrow_mut().sonar_cm = None;
    rig.tick_at(1_500);

    assert_eq!(rig.app.desk_height_cm(), first);
    assert_eq!(rig.app.build_telemetry(1_500).sonar_timeouts, 1);
}

// ── Fan ───────────────────────────────────────────────────────

#[test]
fn pot_at_max_end_runs_fan_full_and_shows_it() {
    let mut rig = Rig::new();
    rig.tick_at(1_000);
    assert_eq!(rig.app.fan_status().duty, 0);

    rig.sim.borrow_mut().adc = Ok(20);
    rig.tick_at(1_010);

    assert_eq!(rig.app.fan_status().duty, 255);
    assert_eq!(rig.sim.borrow().pwm_writes.last(), Some(&255));
    assert_eq!(rig.ui.fan, Some((100, true)));
    assert_eq!(rig.ui.last_state(), Some(UiState::Fan));
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_follows_interval() {
    let mut rig = Rig::new();
    rig.tick_at(1_000);
    assert!(!rig.sink.events.iter().any(|e| matches!(e, AppEvent::Telemetry(_))));

    rig.tick_at(60_000);
    let telem = rig.sink.events.iter().find_map(|e| match e {
        AppEvent::Telemetry(t) => Some(t.clone()),
        _ => None,
    });
    let telem = telem.expect("telemetry emitted");
    assert_eq!(telem.desk, MotionState::Idle);
    assert_eq!(rig.app.tick_count(), 2);
}
