//! Mock console hardware for integration tests.
//!
//! Every mock line talks to one shared [`Sim`] so a test can press keys,
//! turn encoders, park the desk at a height and then assert on relay levels
//! and the full row-drive history without touching real GPIO registers.
//!
//! The clock advances by `step_us` on every query, so the ranger's bounded
//! spins terminate.  Delays advance it by their full length.

#![allow(dead_code)]

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

use desk_console::app::commands::NetCommand;
use desk_console::app::events::AppEvent;
use desk_console::app::ports::{
    AnalogInput, Board, BoardIo, DisplayPort, EventSink, HidPort, MonotonicClock, NetworkPort,
};
use desk_console::drivers::ultrasonic::SPEED_OF_SOUND_CM_PER_US;
use desk_console::error::SensorError;
use desk_console::input::InputPins;
use desk_console::input::encoder::EncoderPins;
use desk_console::ui::{UiState, VolumeAction};

// ── Shared simulation state ───────────────────────────────────

pub struct Sim {
    pub now_us: u64,
    pub step_us: u64,
    /// Current level of each matrix row line (`true` = high).
    pub row_high: [bool; 2],
    pub matrix_pressed: [[bool; 3]; 2],
    pub single_pressed: [bool; 5],
    /// CLK, DT, SW level per encoder (`true` = high).
    pub encoder_lines: [[bool; 3]; 2],
    pub relay_up_high: bool,
    pub relay_down_high: bool,
    /// Every row write as `(row, high)`.
    pub row_writes: Vec<(usize, bool)>,
    /// Relay write log as `(is_up, high)`.
    pub relay_writes: Vec<(bool, bool)>,
    /// Distance the sonar sees; `None` means no echo at all.
    pub sonar_cm: Option<f32>,
    trigger_fall_us: Option<u64>,
    pub adc: Result<u16, SensorError>,
    pub pwm_writes: Vec<u16>,
}

impl Sim {
    fn new() -> Self {
        Self {
            now_us: 0,
            step_us: 5,
            row_high: [true; 2],
            matrix_pressed: [[false; 3]; 2],
            single_pressed: [false; 5],
            encoder_lines: [[true; 3]; 2],
            relay_up_high: false,
            relay_down_high: false,
            row_writes: Vec::new(),
            relay_writes: Vec::new(),
            sonar_cm: None,
            trigger_fall_us: None,
            adc: Ok(1_000),
            pwm_writes: Vec::new(),
        }
    }

    fn echo_high(&self) -> bool {
        let (Some(cm), Some(fall)) = (self.sonar_cm, self.trigger_fall_us) else {
            return false;
        };
        let width = (f64::from(cm) * 2.0 / f64::from(SPEED_OF_SOUND_CM_PER_US)) as u64;
        let start = fall + 100;
        self.now_us >= start && self.now_us < start + width
    }

    /// A closed cell ties its column to its row; only a row pulled low
    /// overcomes the column pull-up.
    fn column_low(&self, col: usize) -> bool {
        (0..2).any(|row| !self.row_high[row] && self.matrix_pressed[row][col])
    }
}

pub type SimRef = Rc<RefCell<Sim>>;

pub fn new_sim() -> SimRef {
    Rc::new(RefCell::new(Sim::new()))
}

// ── Pins ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum InputLine {
    Single(usize),
    Column(usize),
    Encoder { enc: usize, line: usize },
    Echo,
}

pub struct MockInput {
    sim: SimRef,
    line: InputLine,
}

impl ErrorType for MockInput {
    type Error = Infallible;
}

impl InputPin for MockInput {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        let s = self.sim.borrow();
        Ok(match self.line {
            InputLine::Single(i) => !s.single_pressed[i],
            InputLine::Column(c) => !s.column_low(c),
            InputLine::Encoder { enc, line } => s.encoder_lines[enc][line],
            InputLine::Echo => s.echo_high(),
        })
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|h| !h)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum OutputLine {
    Row(usize),
    RelayUp,
    RelayDown,
    Trigger,
}

pub struct MockOutput {
    sim: SimRef,
    line: OutputLine,
}

impl MockOutput {
    fn write(&mut self, high: bool) {
        let mut s = self.sim.borrow_mut();
        match self.line {
            OutputLine::Row(r) => {
                s.row_high[r] = high;
                s.row_writes.push((r, high));
            }
            OutputLine::RelayUp => {
                s.relay_up_high = high;
                s.relay_writes.push((true, high));
            }
            OutputLine::RelayDown => {
                s.relay_down_high = high;
                s.relay_writes.push((false, high));
            }
            OutputLine::Trigger => {
                if !high {
                    let now = s.now_us;
                    s.trigger_fall_us = Some(now);
                }
            }
        }
    }
}

impl ErrorType for MockOutput {
    type Error = Infallible;
}

impl OutputPin for MockOutput {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.write(true);
        Ok(())
    }
}

// ── Time ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockClock(SimRef);

impl MonotonicClock for MockClock {
    fn now_us(&self) -> u64 {
        let mut s = self.0.borrow_mut();
        s.now_us += s.step_us;
        s.now_us
    }
}

#[derive(Clone)]
pub struct MockDelay(SimRef);

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().now_us += u64::from(ns.div_ceil(1_000));
    }
}

// ── Fan I/O ───────────────────────────────────────────────────

pub struct MockAdc(SimRef);

impl AnalogInput for MockAdc {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.0.borrow().adc
    }
}

pub struct MockPwm(SimRef);

impl pwm::ErrorType for MockPwm {
    type Error = Infallible;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.0.borrow_mut().pwm_writes.push(duty);
        Ok(())
    }
}

// ── Board ─────────────────────────────────────────────────────

pub struct MockBoard;

impl Board for MockBoard {
    type Input = MockInput;
    type Output = MockOutput;
    type Delay = MockDelay;
    type Clock = MockClock;
    type Adc = MockAdc;
    type Pwm = MockPwm;
}

pub fn board_io(sim: &SimRef) -> BoardIo<MockBoard> {
    let input = |line| MockInput {
        sim: sim.clone(),
        line,
    };
    let output = |line| MockOutput {
        sim: sim.clone(),
        line,
    };
    let encoder = |enc| EncoderPins {
        clk: input(InputLine::Encoder { enc, line: 0 }),
        dt: input(InputLine::Encoder { enc, line: 1 }),
        sw: input(InputLine::Encoder { enc, line: 2 }),
    };
    BoardIo {
        inputs: InputPins {
            single_row: core::array::from_fn(|i| input(InputLine::Single(i))),
            matrix_rows: core::array::from_fn(|r| output(OutputLine::Row(r))),
            matrix_cols: core::array::from_fn(|c| input(InputLine::Column(c))),
            encoder_volume: encoder(0),
            encoder_hue: encoder(1),
        },
        relay_up: output(OutputLine::RelayUp),
        relay_down: output(OutputLine::RelayDown),
        sonar_trigger: output(OutputLine::Trigger),
        sonar_echo: input(InputLine::Echo),
        fan_adc: MockAdc(sim.clone()),
        fan_pwm: MockPwm(sim.clone()),
        delay: MockDelay(sim.clone()),
        clock: MockClock(sim.clone()),
    }
}

// ── Collaborator recorders ────────────────────────────────────

#[derive(Default)]
pub struct RecordingUi {
    pub states: Vec<(UiState, u32)>,
    pub desk: Vec<(Option<f32>, bool, bool)>,
    pub fan: Option<(u8, bool)>,
    pub hue: Option<(u8, bool)>,
    pub volume: Option<VolumeAction>,
    pub window: Option<bool>,
}

impl RecordingUi {
    pub fn last_state(&self) -> Option<UiState> {
        self.states.last().map(|(s, _)| *s)
    }
}

impl DisplayPort for RecordingUi {
    fn set_desk_context(&mut self, height_cm: Option<f32>, moving: bool, moving_up: bool) {
        self.desk.push((height_cm, moving, moving_up));
    }
    fn set_ui_state(&mut self, state: UiState, duration_ms: u32) {
        self.states.push((state, duration_ms));
    }
    fn set_fan_context(&mut self, percent: u8, active: bool) {
        self.fan = Some((percent, active));
    }
    fn set_hue_context(&mut self, brightness_percent: u8, lights_on: bool) {
        self.hue = Some((brightness_percent, lights_on));
    }
    fn set_volume_context(&mut self, action: VolumeAction) {
        self.volume = Some(action);
    }
    fn set_window_context(&mut self, opening: bool) {
        self.window = Some(opening);
    }
}

pub struct RecordingNet {
    pub sent: Vec<NetCommand>,
    /// When false every command is refused, as with a full queue.
    pub accept: bool,
}

impl Default for RecordingNet {
    fn default() -> Self {
        Self {
            sent: Vec::new(),
            accept: true,
        }
    }
}

impl NetworkPort for RecordingNet {
    fn send_command(&mut self, cmd: NetCommand) -> bool {
        if self.accept {
            self.sent.push(cmd);
        }
        self.accept
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidCall {
    VolumeUp,
    VolumeDown,
    Mute,
    Sleep,
}

#[derive(Default)]
pub struct RecordingHid {
    pub calls: Vec<HidCall>,
}

impl HidPort for RecordingHid {
    fn send_volume_up(&mut self) {
        self.calls.push(HidCall::VolumeUp);
    }
    fn send_volume_down(&mut self) {
        self.calls.push(HidCall::VolumeDown);
    }
    fn send_mute(&mut self) {
        self.calls.push(HidCall::Mute);
    }
    fn send_sleep(&mut self) {
        self.calls.push(HidCall::Sleep);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn emergency_stops(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::EmergencyStop { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
