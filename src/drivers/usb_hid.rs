//! USB HID device on the ESP32-S3 native USB port.
//!
//! One HID interface with a single interrupt IN endpoint carries two
//! top-level collections:
//!
//! | Report id | Collection               | Field                        |
//! |-----------|--------------------------|------------------------------|
//! | 1         | Consumer Control         | 16-bit usage array, 1 slot   |
//! | 2         | Generic Desktop System   | 8-bit usage array 0x81-0x83  |
//!
//! A zero in either field is outside the logical range, which the host
//! reads as "no key", so the all-zero reports from
//! [`HidAdapter`](crate::adapters::hid::HidAdapter) are key releases.
//!
//! The device side is TinyUSB through the `esp_tinyusb` IDF component;
//! device and string descriptors come from its Kconfig defaults.

use crate::adapters::hid::{CONSUMER_REPORT_ID, SYSTEM_REPORT_ID};

const REPORT_DESCRIPTOR_LEN: usize = 50;

/// HID report descriptor for both collections.
#[rustfmt::skip]
pub static REPORT_DESCRIPTOR: [u8; REPORT_DESCRIPTOR_LEN] = [
    // Consumer Control
    0x05, 0x0C,             // Usage Page (Consumer)
    0x09, 0x01,             // Usage (Consumer Control)
    0xA1, 0x01,             // Collection (Application)
    0x85, CONSUMER_REPORT_ID,
    0x15, 0x01,             //   Logical Minimum (1)
    0x26, 0xFF, 0x03,       //   Logical Maximum (0x3FF)
    0x19, 0x01,             //   Usage Minimum (1)
    0x2A, 0xFF, 0x03,       //   Usage Maximum (0x3FF)
    0x95, 0x01,             //   Report Count (1)
    0x75, 0x10,             //   Report Size (16)
    0x81, 0x00,             //   Input (Data, Array, Absolute)
    0xC0,                   // End Collection
    // System Control
    0x05, 0x01,             // Usage Page (Generic Desktop)
    0x09, 0x80,             // Usage (System Control)
    0xA1, 0x01,             // Collection (Application)
    0x85, SYSTEM_REPORT_ID,
    0x16, 0x81, 0x00,       //   Logical Minimum (0x81)
    0x26, 0x83, 0x00,       //   Logical Maximum (0x83)
    0x19, 0x81,             //   Usage Minimum (System Power Down)
    0x29, 0x83,             //   Usage Maximum (System Wake Up)
    0x95, 0x01,             //   Report Count (1)
    0x75, 0x08,             //   Report Size (8)
    0x81, 0x00,             //   Input (Data, Array, Absolute)
    0xC0,                   // End Collection
];

/// Interrupt IN endpoint address.
pub const HID_EP_IN: u8 = 0x81;
const HID_EP_SIZE: u8 = 16;
const HID_POLL_MS: u8 = 10;

const CONFIG_TOTAL_LEN: usize = 9 + 9 + 9 + 7;
const REPORT_LEN: [u8; 2] = (REPORT_DESCRIPTOR_LEN as u16).to_le_bytes();
const TOTAL_LEN: [u8; 2] = (CONFIG_TOTAL_LEN as u16).to_le_bytes();

/// Configuration, interface, HID and endpoint descriptors, bus powered at
/// 100 mA with remote wakeup so the system-wake key can rouse the host.
#[rustfmt::skip]
pub static CONFIG_DESCRIPTOR: [u8; CONFIG_TOTAL_LEN] = [
    // Configuration
    0x09, 0x02, TOTAL_LEN[0], TOTAL_LEN[1],
    0x01,                   // bNumInterfaces
    0x01,                   // bConfigurationValue
    0x00,                   // iConfiguration
    0xA0,                   // bus powered, remote wakeup
    50,                     // 100 mA
    // Interface 0: HID, no boot protocol
    0x09, 0x04, 0x00, 0x00, 0x01, 0x03, 0x00, 0x00, 0x00,
    // HID 1.11
    0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, REPORT_LEN[0], REPORT_LEN[1],
    // Endpoint: interrupt IN
    0x07, 0x05, HID_EP_IN, 0x03, HID_EP_SIZE, 0x00, HID_POLL_MS,
];

#[cfg(target_os = "espidf")]
pub use device::TinyUsbHid;

#[cfg(target_os = "espidf")]
mod device {
    use core::ffi::c_uint;

    use esp_idf_svc::sys::{EspError, esp};
    use esp_idf_svc::sys::tinyusb as tusb;
    use log::info;

    use super::{CONFIG_DESCRIPTOR, REPORT_DESCRIPTOR};
    use crate::adapters::hid::HidLink;

    /// HID interface instance within the TinyUSB device.
    const INSTANCE: u8 = 0;

    /// The installed TinyUSB driver.  Only one may exist.
    pub struct TinyUsbHid {
        _installed: (),
    }

    impl TinyUsbHid {
        /// Install the TinyUSB driver with the console's descriptors.
        pub fn install() -> Result<Self, EspError> {
            // SAFETY: tinyusb_config_t is plain data; all-zero means "use the
            // Kconfig defaults" for every field not set below.  The
            // descriptor outlives the driver.
            let mut cfg: tusb::tinyusb_config_t = unsafe { core::mem::zeroed() };
            cfg.__bindgen_anon_2.__bindgen_anon_1.configuration_descriptor =
                CONFIG_DESCRIPTOR.as_ptr();
            // SAFETY: called once from main before the poll loop starts.
            esp!(unsafe { tusb::tinyusb_driver_install(&cfg) })?;
            info!("USB HID: driver installed ({} byte report map)", REPORT_DESCRIPTOR.len());
            Ok(Self { _installed: () })
        }
    }

    impl HidLink for TinyUsbHid {
        fn ready(&mut self) -> bool {
            // SAFETY: TinyUSB device-state getters, callable from any task.
            unsafe {
                if tusb::tud_suspended() {
                    // Keys pressed while the host sleeps wake it first.
                    tusb::tud_remote_wakeup();
                    return false;
                }
                tusb::tud_mounted() && tusb::tud_hid_n_ready(INSTANCE)
            }
        }

        fn send(&mut self, report_id: u8, payload: &[u8]) -> bool {
            // SAFETY: TinyUSB copies the payload into its endpoint buffer
            // before returning.
            unsafe {
                tusb::tud_hid_n_report(
                    INSTANCE,
                    report_id,
                    payload.as_ptr().cast(),
                    payload.len() as u16,
                )
            }
        }
    }

    // ── TinyUSB class callbacks ───────────────────────────────

    #[unsafe(no_mangle)]
    extern "C" fn tud_hid_descriptor_report_cb(_instance: u8) -> *const u8 {
        REPORT_DESCRIPTOR.as_ptr()
    }

    /// GET_REPORT on the control pipe: nothing to report, the host stalls.
    #[unsafe(no_mangle)]
    extern "C" fn tud_hid_get_report_cb(
        _instance: u8,
        _report_id: u8,
        _report_type: c_uint,
        _buffer: *mut u8,
        _reqlen: u16,
    ) -> u16 {
        0
    }

    /// SET_REPORT / OUT data.  The console has no output reports.
    #[unsafe(no_mangle)]
    extern "C" fn tud_hid_set_report_cb(
        _instance: u8,
        _report_id: u8,
        _report_type: c_uint,
        _buffer: *const u8,
        _bufsize: u16,
    ) {
    }

    #[unsafe(no_mangle)]
    extern "C" fn tud_mount_cb() {
        info!("USB HID: mounted");
    }

    #[unsafe(no_mangle)]
    extern "C" fn tud_umount_cb() {
        info!("USB HID: unmounted");
    }
}
