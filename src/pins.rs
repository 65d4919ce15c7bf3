//! GPIO / peripheral pin assignments for the desk console board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Single-row switches (active-low, internal pull-up)
// ---------------------------------------------------------------------------

/// Leftmost to rightmost switch of the independent row.
pub const SINGLE_ROW_GPIOS: [i32; 5] = [18, 17, 16, 15, 1];

// ---------------------------------------------------------------------------
// 2 × 3 switch matrix
// ---------------------------------------------------------------------------

/// Row drive lines (outputs, one active at a time).
pub const MATRIX_ROW_GPIOS: [i32; 2] = [6, 5];
/// Column sense lines (inputs with pull-up).
pub const MATRIX_COL_GPIOS: [i32; 3] = [2, 42, 41];

// ---------------------------------------------------------------------------
// Rotary encoders (CLK, DT, SW), all inputs with pull-up
// ---------------------------------------------------------------------------

/// Encoder 1: host volume.
pub const ENCODER1_GPIOS: [i32; 3] = [46, 3, 8];
/// Encoder 2: Hue brightness.
pub const ENCODER2_GPIOS: [i32; 3] = [11, 10, 9];

// ---------------------------------------------------------------------------
// Desk motor relays
// ---------------------------------------------------------------------------

pub const RELAY_UP_GPIO: i32 = 40;
pub const RELAY_DOWN_GPIO: i32 = 37;

// ---------------------------------------------------------------------------
// Ultrasonic ranger (HC-SR04 style)
// ---------------------------------------------------------------------------

pub const SONAR_TRIGGER_GPIO: i32 = 12;
/// Echo input.  The sensor runs at 5 V; the line goes through a divider.
pub const SONAR_ECHO_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Fan (potentiometer on ADC1, 4-wire fan PWM on LEDC)
// ---------------------------------------------------------------------------

/// Potentiometer wiper: ADC1 channel 3 (GPIO 4 on ESP32-S3).
pub const FAN_POT_GPIO: i32 = 4;
pub const FAN_POT_ADC1_CHANNEL: u32 = 3;
pub const FAN_PWM_GPIO: i32 = 14;
/// 25 kHz is the Intel 4-wire fan PWM specification frequency.
pub const FAN_PWM_FREQ_HZ: u32 = 25_000;
/// LEDC timer resolution (bits).  8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;

// ---------------------------------------------------------------------------
// OLED panel (SSD1306, I2C port 0)
// ---------------------------------------------------------------------------

/// Must match the pads handed to the I2C driver in `main`.
pub const OLED_SDA_GPIO: i32 = 38;
pub const OLED_SCL_GPIO: i32 = 39;
pub const OLED_I2C_FREQ_HZ: u32 = 400_000;
