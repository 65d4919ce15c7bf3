//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the input poller, the desk controller, the height
//! ranger and the fan controller.  It exposes a clean, hardware-agnostic
//! API.  Collaborators (screen, network, USB HID, event sink) are injected
//! at call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  Switches ──▶ ┌────────────────────────┐ ──▶ DisplayPort
//!  Encoders ──▶ │      AppService        │ ──▶ NetworkPort
//!  Sonar    ──▶ │  Poller · Desk · Fan   │ ──▶ HidPort
//!  Pot      ──▶ └────────────────────────┘ ──▶ EventSink
//! ```

use log::{info, warn};

use crate::config::{ConsoleConfig, HUE_SCENE_COUNT};
use crate::control::fan::{FanSpeedController, FanStatus};
use crate::desk::{DeskMotionController, Direction, MotionState};
use crate::drivers::relay::Relay;
use crate::drivers::ultrasonic::UltrasonicRanger;
use crate::events::{EncoderId, InputEvent, Rotation, SwitchId};
use crate::input::Poller;
use crate::ui::{UiState, VolumeAction};

use super::commands::{AppCommand, NetCommand};
use super::events::{AppEvent, StopReason, TelemetryData};
use super::ports::{
    Board, BoardIo, DisplayPort, EventSink, HidPort, MonotonicClock, NetworkPort,
};

/// Highest brightness the Hue API accepts.
pub const HUE_MAX_BRIGHTNESS: u8 = 254;

// ───────────────────────────────────────────────────────────────
// Key map
// ───────────────────────────────────────────────────────────────

/// Console key assignments.  Desk key releases are not commands; the
/// service handles them itself.
pub fn key_map(event: InputEvent) -> Option<AppCommand> {
    match event {
        InputEvent::SwitchPressed(id) => match id {
            SwitchId::DeskUp => Some(AppCommand::DeskUp),
            SwitchId::DeskDown => Some(AppCommand::DeskDown),
            SwitchId::Matrix { row: 0, col: 1 } => Some(AppCommand::SkylightUp),
            SwitchId::Matrix { row: 1, col: 1 } => Some(AppCommand::SkylightDown),
            SwitchId::Matrix { row: 0, col: 2 } => Some(AppCommand::HueToggle),
            SwitchId::Matrix { row: 1, col: 2 } => Some(AppCommand::Sleep),
            SwitchId::Matrix { .. } => None,
            SwitchId::SingleRow(i) if usize::from(i) < HUE_SCENE_COUNT => {
                Some(AppCommand::HueScene(i))
            }
            SwitchId::SingleRow(4) => Some(AppCommand::Mute),
            SwitchId::SingleRow(_) => None,
        },
        InputEvent::SwitchReleased(_) => None,
        InputEvent::EncoderButtonPressed(EncoderId::Volume) => Some(AppCommand::Mute),
        InputEvent::EncoderButtonPressed(EncoderId::Hue) => Some(AppCommand::HueToggle),
        InputEvent::EncoderTurned(EncoderId::Volume, Rotation::Clockwise) => {
            Some(AppCommand::VolumeUp)
        }
        InputEvent::EncoderTurned(EncoderId::Volume, Rotation::CounterClockwise) => {
            Some(AppCommand::VolumeDown)
        }
        InputEvent::EncoderTurned(EncoderId::Hue, Rotation::Clockwise) => {
            Some(AppCommand::HueBrighter)
        }
        InputEvent::EncoderTurned(EncoderId::Hue, Rotation::CounterClockwise) => {
            Some(AppCommand::HueDimmer)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

type BoardRanger<B> = UltrasonicRanger<
    <B as Board>::Output,
    <B as Board>::Input,
    <B as Board>::Delay,
    <B as Board>::Clock,
>;

/// The application service orchestrates all domain logic.
pub struct AppService<B: Board> {
    config: ConsoleConfig,
    clock: B::Clock,
    poller: Poller<B::Input, B::Output, B::Delay>,
    desk: DeskMotionController<B::Output>,
    ranger: BoardRanger<B>,
    fan: FanSpeedController<B::Adc, B::Pwm>,
    next_height_sample_ms: u64,
    next_telemetry_ms: u64,
    last_fan: Option<FanStatus>,
    hue_brightness: u8,
    hue_on: bool,
    tick_count: u64,
    emergency_stops: u32,
    dropped_commands: u32,
}

impl<B: Board> AppService<B> {
    /// Construct the service from configuration and configured peripherals.
    ///
    /// Relays are released and the fan is stopped before this returns.
    pub fn new(config: ConsoleConfig, io: BoardIo<B>) -> Self {
        let poller = Poller::new(io.inputs, io.delay.clone(), &config.input);
        let desk = DeskMotionController::new(io.relay_up, io.relay_down, &config.desk, &config.ui);
        let ranger = UltrasonicRanger::new(
            io.sonar_trigger,
            io.sonar_echo,
            io.delay,
            io.clock.clone(),
            &config.sonar,
        );
        let fan = FanSpeedController::new(io.fan_adc, io.fan_pwm, config.fan.clone());
        let hue_brightness = config.network.hue_initial_brightness.min(HUE_MAX_BRIGHTNESS);
        let next_telemetry_ms = config.telemetry_interval_ms;

        Self {
            config,
            clock: io.clock,
            poller,
            desk,
            ranger,
            fan,
            next_height_sample_ms: 0,
            next_telemetry_ms,
            last_fan: None,
            hue_brightness,
            hue_on: false,
            tick_count: 0,
            emergency_stops: 0,
            dropped_commands: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Show the boot screen and announce the service.
    pub fn start(&mut self, ui: &mut impl DisplayPort, sink: &mut impl EventSink) {
        ui.set_hue_context(self.hue_percent(), self.hue_on);
        ui.set_desk_context(None, false, false);
        ui.set_ui_state(UiState::BootInfo, self.config.ui.event_display_ms);
        sink.emit(&AppEvent::Started);
        info!("AppService started, desk {:?}", self.desk.state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one poll cycle: inputs → height → fan → safety → telemetry.
    pub fn tick(
        &mut self,
        ui: &mut impl DisplayPort,
        net: &mut impl NetworkPort,
        hid: &mut impl HidPort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let now = self.clock.now_ms();

        // 1. Inputs
        for event in self.poller.poll(now) {
            self.dispatch(event, now, ui, net, hid, sink);
        }

        // 2. Height
        if now >= self.next_height_sample_ms {
            self.next_height_sample_ms = now + self.config.sonar.height_sample_interval_ms;
            let height = self
                .ranger
                .measure_distance()
                .map(|cm| cm + self.config.sonar.height_offset_cm);
            self.desk.record_height(height);
            if height.is_some() {
                let direction = self.desk.state().direction();
                ui.set_desk_context(height, direction.is_some(), direction == Some(Direction::Up));
            }
        }

        // 3. Fan
        let fan = self.fan.update();
        ui.set_fan_context(fan.percent, fan.active);
        let fan_changed = self.last_fan.is_some_and(|prev| prev.duty != fan.duty);
        if fan_changed && self.desk.state() == MotionState::Idle {
            ui.set_ui_state(UiState::Fan, self.config.ui.event_display_ms);
        }
        self.last_fan = Some(fan);

        // 4. Safety, every tick
        if let Some(elapsed_ms) = self.desk.check_safety_timeout(self.clock.now_ms(), ui) {
            self.emergency_stops = self.emergency_stops.saturating_add(1);
            sink.emit(&AppEvent::EmergencyStop { elapsed_ms });
        }

        // 5. Telemetry
        if now >= self.next_telemetry_ms {
            self.next_telemetry_ms = now + self.config.telemetry_interval_ms;
            sink.emit(&AppEvent::Telemetry(self.build_telemetry(now)));
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.  Same effect as the matching key.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        ui: &mut impl DisplayPort,
        net: &mut impl NetworkPort,
        hid: &mut impl HidPort,
        sink: &mut impl EventSink,
    ) {
        let now = self.clock.now_ms();
        self.execute(cmd, now, ui, net, hid, sink);
    }

    fn dispatch(
        &mut self,
        event: InputEvent,
        now: u64,
        ui: &mut impl DisplayPort,
        net: &mut impl NetworkPort,
        hid: &mut impl HidPort,
        sink: &mut impl EventSink,
    ) {
        match event {
            InputEvent::SwitchReleased(SwitchId::DeskUp) => {
                self.release_desk(Direction::Up, now, ui, sink);
            }
            InputEvent::SwitchReleased(SwitchId::DeskDown) => {
                self.release_desk(Direction::Down, now, ui, sink);
            }
            other => match key_map(other) {
                Some(cmd) => self.execute(cmd, now, ui, net, hid, sink),
                None => log::debug!("Input {:?} has no action", other),
            },
        }
    }

    fn execute(
        &mut self,
        cmd: AppCommand,
        now: u64,
        ui: &mut impl DisplayPort,
        net: &mut impl NetworkPort,
        hid: &mut impl HidPort,
        sink: &mut impl EventSink,
    ) {
        let event_ms = self.config.ui.event_display_ms;
        match cmd {
            AppCommand::DeskUp => self.start_desk(Direction::Up, now, ui, sink),
            AppCommand::DeskDown => self.start_desk(Direction::Down, now, ui, sink),
            AppCommand::DeskStop => {
                let previous = self.desk.stop(ui);
                Self::report_stop(previous, StopReason::Command, now, sink);
            }

            AppCommand::SkylightUp | AppCommand::SkylightDown => {
                let opening = cmd == AppCommand::SkylightUp;
                let net_cmd = if opening {
                    NetCommand::SkylightUp
                } else {
                    NetCommand::SkylightDown
                };
                info!("Skylight {}", if opening { "up" } else { "down" });
                self.send(net_cmd, net, sink);
                ui.set_window_context(opening);
                ui.set_ui_state(UiState::Window, event_ms);
            }

            AppCommand::HueToggle => {
                let on = !self.hue_on;
                if self.send(NetCommand::HueSetOn(on), net, sink) {
                    self.hue_on = on;
                }
                info!("Hue lights {}", if self.hue_on { "on" } else { "off" });
                self.show_hue(ui);
            }
            AppCommand::HueScene(index) => {
                if usize::from(index) >= HUE_SCENE_COUNT {
                    warn!("Hue scene {} out of range", index);
                    return;
                }
                if self.send(NetCommand::HueScene(index), net, sink) {
                    self.hue_on = true;
                }
                info!("Hue scene {}", index + 1);
                self.show_hue(ui);
            }
            AppCommand::HueBrighter | AppCommand::HueDimmer => {
                let step = self.config.network.hue_brightness_step;
                let target = if cmd == AppCommand::HueBrighter {
                    self.hue_brightness.saturating_add(step).min(HUE_MAX_BRIGHTNESS)
                } else {
                    self.hue_brightness.saturating_sub(step)
                };
                if self.send(NetCommand::HueBrightness(target), net, sink) {
                    self.hue_brightness = target;
                }
                self.show_hue(ui);
            }

            AppCommand::VolumeUp => {
                hid.send_volume_up();
                self.show_volume(VolumeAction::Up, ui);
            }
            AppCommand::VolumeDown => {
                hid.send_volume_down();
                self.show_volume(VolumeAction::Down, ui);
            }
            AppCommand::Mute => {
                info!("Host mute");
                hid.send_mute();
                self.show_volume(VolumeAction::Mute, ui);
            }
            AppCommand::Sleep => {
                info!("Host sleep");
                hid.send_sleep();
                ui.set_ui_state(UiState::Suspend, event_ms);
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot.
    pub fn build_telemetry(&self, now_ms: u64) -> TelemetryData {
        let fan = self.fan.status();
        TelemetryData {
            uptime_ms: now_ms,
            desk: self.desk.state(),
            height_cm: self.desk.height_cm(),
            fan_duty: fan.duty,
            fan_percent: fan.percent,
            volume_encoder: self.poller.encoder_value(EncoderId::Volume),
            hue_encoder: self.poller.encoder_value(EncoderId::Hue),
            hue_brightness: self.hue_brightness,
            hue_on: self.hue_on,
            sonar_timeouts: self.ranger.timeout_count(),
            emergency_stops: self.emergency_stops,
            dropped_commands: self.dropped_commands,
        }
    }

    pub fn desk_state(&self) -> MotionState {
        self.desk.state()
    }

    pub fn desk_height_cm(&self) -> Option<f32> {
        self.desk.height_cm()
    }

    /// Whether `relay` is currently commanded closed.
    pub fn relay_energized(&self, relay: Relay) -> bool {
        self.desk.is_energized(relay)
    }

    pub fn fan_status(&self) -> FanStatus {
        self.fan.status()
    }

    pub fn hue_state(&self) -> (u8, bool) {
        (self.hue_brightness, self.hue_on)
    }

    pub fn encoder_value(&self, id: EncoderId) -> i32 {
        self.poller.encoder_value(id)
    }

    /// Total poll ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn emergency_stops(&self) -> u32 {
        self.emergency_stops
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn start_desk(
        &mut self,
        direction: Direction,
        now: u64,
        ui: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) {
        if self.desk.start(direction, now, ui) {
            sink.emit(&AppEvent::DeskMoving {
                direction,
                since_ms: now,
            });
        }
    }

    /// A hold-to-run key was let go: stop only if it is the one driving.
    fn release_desk(
        &mut self,
        direction: Direction,
        now: u64,
        ui: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) {
        if self.desk.state().direction() == Some(direction) {
            let previous = self.desk.stop(ui);
            Self::report_stop(previous, StopReason::Released, now, sink);
        }
    }

    fn report_stop(previous: MotionState, reason: StopReason, now: u64, sink: &mut impl EventSink) {
        if let Some(since) = previous.since_ms() {
            sink.emit(&AppEvent::DeskStopped {
                reason,
                moved_ms: now.saturating_sub(since),
            });
        }
    }

    /// Queue `cmd`; a full queue is logged and reported, never retried.
    fn send(&mut self, cmd: NetCommand, net: &mut impl NetworkPort, sink: &mut impl EventSink) -> bool {
        if net.send_command(cmd) {
            return true;
        }
        warn!("Network queue full, dropped {:?}", cmd);
        self.dropped_commands = self.dropped_commands.saturating_add(1);
        sink.emit(&AppEvent::NetworkCommandDropped(cmd));
        false
    }

    fn hue_percent(&self) -> u8 {
        (u16::from(self.hue_brightness) * 100 / u16::from(HUE_MAX_BRIGHTNESS)) as u8
    }

    fn show_hue(&self, ui: &mut impl DisplayPort) {
        ui.set_hue_context(self.hue_percent(), self.hue_on);
        ui.set_ui_state(UiState::Hue, self.config.ui.event_display_ms);
    }

    fn show_volume(&self, action: VolumeAction, ui: &mut impl DisplayPort) {
        ui.set_volume_context(action);
        ui.set_ui_state(UiState::Volume, self.config.ui.event_display_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desk_keys_map_to_desk_commands() {
        assert_eq!(
            key_map(InputEvent::SwitchPressed(SwitchId::DeskUp)),
            Some(AppCommand::DeskUp)
        );
        assert_eq!(
            key_map(InputEvent::SwitchPressed(SwitchId::DeskDown)),
            Some(AppCommand::DeskDown)
        );
        assert_eq!(key_map(InputEvent::SwitchReleased(SwitchId::DeskUp)), None);
    }

    #[test]
    fn matrix_cells_follow_console_legend() {
        let cell = |row, col| key_map(InputEvent::SwitchPressed(SwitchId::Matrix { row, col }));
        assert_eq!(cell(0, 1), Some(AppCommand::SkylightUp));
        assert_eq!(cell(1, 1), Some(AppCommand::SkylightDown));
        assert_eq!(cell(0, 2), Some(AppCommand::HueToggle));
        assert_eq!(cell(1, 2), Some(AppCommand::Sleep));
    }

    #[test]
    fn single_row_scenes_then_mute() {
        for i in 0..4 {
            assert_eq!(
                key_map(InputEvent::SwitchPressed(SwitchId::SingleRow(i))),
                Some(AppCommand::HueScene(i))
            );
        }
        assert_eq!(
            key_map(InputEvent::SwitchPressed(SwitchId::SingleRow(4))),
            Some(AppCommand::Mute)
        );
    }

    #[test]
    fn encoders_map_to_volume_and_brightness() {
        assert_eq!(
            key_map(InputEvent::EncoderTurned(EncoderId::Volume, Rotation::Clockwise)),
            Some(AppCommand::VolumeUp)
        );
        assert_eq!(
            key_map(InputEvent::EncoderTurned(EncoderId::Hue, Rotation::CounterClockwise)),
            Some(AppCommand::HueDimmer)
        );
        assert_eq!(
            key_map(InputEvent::EncoderButtonPressed(EncoderId::Hue)),
            Some(AppCommand::HueToggle)
        );
    }
}
