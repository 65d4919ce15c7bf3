//! Desk Console Firmware: Main Entry Point
//!
//! Hexagonal architecture around a single cooperative poll loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  DisplayAdapter    HttpNetworkAdapter   HidAdapter             │
//! │  (DisplayPort)     (NetworkPort)        (HidPort)              │
//! │  LogEventSink      Esp32TimeAdapter     EspBoard (GPIO/ADC/PWM)│
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Poller · DeskMotionController · Ranger · Fan          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Core 1: poll loop        Core 0: network + display workers    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{error, info, warn};

use desk_console::adapters::display::{self, DisplayAdapter};
use desk_console::adapters::hid::{HidAdapter, HidLink};
use desk_console::adapters::http::{self, HttpNetworkAdapter};
use desk_console::adapters::log_sink::LogEventSink;
use desk_console::adapters::time::Esp32TimeAdapter;
use desk_console::app::ports::MonotonicClock;
use desk_console::app::service::AppService;
use desk_console::config::{ConsoleConfig, NetworkConfig};
use desk_console::drivers::board::{self, EspBoard};
use desk_console::drivers::oled::Oled;
use desk_console::drivers::task_pin::{Core, spawn_on_core};
use desk_console::drivers::usb_hid::TinyUsbHid;
use desk_console::drivers::{hw_init, watchdog::Watchdog};
use desk_console::pins;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Desk Console v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (compiled-in) ────────────────────────
    let config = ConsoleConfig::default();
    if let Err(e) = config.validate() {
        error!("Config invalid: {}; halting", e);
        halt();
    }
    match serde_json::to_string(&config) {
        Ok(json) => info!("Config: {}", json),
        Err(e) => warn!("Config not printable: {}", e),
    }

    // ── 3. Hardware peripherals ───────────────────────────────
    if let Err(e) = hw_init::init_peripherals(&config) {
        // Peripheral init failure is critical: log and halt.
        // The watchdog is not armed yet, so this waits for a power cycle.
        error!("HAL init failed: {}; halting", e);
        halt();
    }
    let watchdog = Watchdog::new(config.watchdog_timeout_secs);

    // ── 4. Wi-Fi + SNTP (best effort) ─────────────────────────
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio38,
        peripherals.pins.gpio39,
        &I2cConfig::new().baudrate(Hertz(pins::OLED_I2C_FREQ_HZ)),
    )?;
    let oled = Oled::new(i2c);
    let mut usb = match TinyUsbHid::install() {
        Ok(usb) => Some(usb),
        Err(e) => {
            warn!("USB HID unavailable ({}); media keys are discarded", e);
            None
        }
    };

    let _wifi = match connect_wifi(peripherals.modem, sys_loop, nvs, &config.network) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("Wi-Fi unavailable ({:#}); network keys will fail", e);
            None
        }
    };
    let _sntp = match EspSntp::new_default() {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("SNTP not started ({}); clock shows --:--", e);
            None
        }
    };

    // ── 5. Workers on the protocol core ───────────────────────
    let net_cfg = config.network.clone();
    spawn_on_core(Core::Pro, 5, 8, "net\0", move || http::run_network_worker(net_cfg))?;
    spawn_on_core(Core::Pro, 3, 6, "display\0", move || {
        display::run_display_worker(Esp32TimeAdapter::new(), oled)
    })?;

    // ── 6. Application core ───────────────────────────────────
    let clock = Esp32TimeAdapter::new();
    let poll_interval_ms = u64::from(config.poll_interval_ms);
    let mut app = AppService::<EspBoard>::new(config, board::board_io());
    let mut ui = DisplayAdapter::new(clock);
    let mut net = HttpNetworkAdapter::new();
    let mut hid = HidAdapter::new();
    let mut sink = LogEventSink::new();

    app.start(&mut ui, &mut sink);
    info!(
        "Poll loop: {}ms period, watchdog {}s, up {}s",
        poll_interval_ms,
        watchdog.timeout_secs(),
        clock.uptime_secs()
    );

    // ── 7. Poll loop ──────────────────────────────────────────
    loop {
        let tick_start = clock.now_ms();

        app.tick(&mut ui, &mut net, &mut hid, &mut sink);
        ui.refresh();
        flush_hid(&mut hid, usb.as_mut());
        watchdog.feed();

        let spent = clock.now_ms().saturating_sub(tick_start);
        if spent < poll_interval_ms {
            std::thread::sleep(Duration::from_millis(poll_interval_ms - spent));
        }
    }
}

fn connect_wifi(
    modem: esp_idf_hal::modem::Modem,
    sys_loop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    network: &NetworkConfig,
) -> Result<BlockingWifi<EspWifi<'static>>> {
    if network.wifi_ssid.is_empty() {
        anyhow::bail!("no SSID configured");
    }
    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sys_loop.clone(), Some(nvs))?, sys_loop)?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: network
            .wifi_ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow::anyhow!("wifi ssid too long"))?,
        password: network
            .wifi_password
            .as_str()
            .try_into()
            .map_err(|_| anyhow::anyhow!("wifi password too long"))?,
        ..Default::default()
    }))?;
    wifi.start()?;
    info!("Wi-Fi started, connecting to `{}`", network.wifi_ssid);
    wifi.connect()?;
    wifi.wait_netif_up()?;
    info!("Wi-Fi connected");
    Ok(wifi)
}

/// Hand queued HID reports to the USB endpoint.
fn flush_hid(hid: &mut HidAdapter, link: Option<&mut impl HidLink>) {
    match link {
        Some(link) => {
            hid.flush(link);
        }
        None => {
            hid.discard();
        }
    }
}

fn halt() -> ! {
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}
