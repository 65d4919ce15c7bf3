//! HTTP network adapter.
//!
//! The poll loop never blocks on the network.  [`HttpNetworkAdapter`]
//! implements [`NetworkPort`] by pushing a [`NetCommand`] into a bounded
//! static channel; [`run_network_worker`] drains it on its own thread and
//! performs the request.
//!
//! ```text
//! ┌──────────────┐  NetCommand  ┌────────────────┐  HTTP  ┌──────────────┐
//! │  Poll loop   │─────────────▶│ Network worker │───────▶│ Skylight/Hue │
//! │  (try_send)  │   depth 8    │  (block_on)    │        └──────────────┘
//! └──────────────┘              └────────────────┘
//! ```
//!
//! Requests are fire-and-forget: failures are logged, never reported back.

use core::fmt::Write as _;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use heapless::String;
use log::{debug, info, warn};

use crate::app::commands::NetCommand;
use crate::app::ports::NetworkPort;
use crate::config::{HOST_CAP, HUE_API_KEY_CAP, HUE_GROUP_ID_CAP, HUE_SCENE_ID_CAP, NetworkConfig};
use crate::error::CommsError;

/// Channel depth for outbound commands.
pub const NET_QUEUE_DEPTH: usize = 8;

const HUE_URL_PARTS: [&str; 4] = ["http://", "/api/", "/groups/", "/action"];
const SKYLIGHT_URL_PARTS: [&str; 2] = ["http://", "/control_remote?command=down"];

const fn total_len(parts: &[&str]) -> usize {
    let mut n = 0;
    let mut i = 0;
    while i < parts.len() {
        n += parts[i].len();
        i += 1;
    }
    n
}

const fn larger(a: usize, b: usize) -> usize {
    if a > b { a } else { b }
}

/// Longest URL any fully populated [`NetworkConfig`] can produce.
pub const MAX_URL_LEN: usize = larger(
    total_len(&HUE_URL_PARTS) + HOST_CAP + HUE_API_KEY_CAP + HUE_GROUP_ID_CAP,
    total_len(&SKYLIGHT_URL_PARTS) + HOST_CAP,
);
/// `{"scene":"..."}` with the longest scene id; the other bodies are shorter.
pub const MAX_BODY_LEN: usize = r#"{"scene":""}"#.len() + HUE_SCENE_ID_CAP;

/// Outbound command channel: poll loop → network worker.
pub static NET_CHANNEL: Channel<CriticalSectionRawMutex, NetCommand, NET_QUEUE_DEPTH> =
    Channel::new();

pub type NetSender = Sender<'static, CriticalSectionRawMutex, NetCommand, NET_QUEUE_DEPTH>;
pub type NetReceiver = Receiver<'static, CriticalSectionRawMutex, NetCommand, NET_QUEUE_DEPTH>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
}

/// A fully resolved request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String<MAX_URL_LEN>,
    /// JSON body; empty for GET.
    pub body: String<MAX_BODY_LEN>,
}

// ───────────────────────────────────────────────────────────────
// Request building
// ───────────────────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct OnBody {
    on: bool,
}

#[derive(serde::Serialize)]
struct BrightnessBody {
    bri: u8,
}

#[derive(serde::Serialize)]
struct SceneBody<'a> {
    scene: &'a str,
}

/// Resolve `cmd` against the configured hosts.
pub fn build_request(cmd: &NetCommand, cfg: &NetworkConfig) -> Result<HttpRequest, CommsError> {
    let mut url: String<MAX_URL_LEN> = String::new();

    let json = match *cmd {
        NetCommand::SkylightUp | NetCommand::SkylightDown => {
            let action = if *cmd == NetCommand::SkylightUp { "up" } else { "down" };
            write!(url, "http://{}/control_remote?command={}", cfg.skylight_host, action)
                .map_err(|_| CommsError::RequestTooLarge)?;
            return Ok(HttpRequest {
                method: HttpMethod::Get,
                url,
                body: String::new(),
            });
        }
        NetCommand::HueSetOn(on) => serde_json::to_string(&OnBody { on }),
        NetCommand::HueBrightness(bri) => serde_json::to_string(&BrightnessBody { bri }),
        NetCommand::HueScene(index) => {
            let scene = cfg
                .hue_scene_ids
                .get(usize::from(index))
                .filter(|id| !id.is_empty())
                .ok_or(CommsError::UnknownScene(index))?;
            serde_json::to_string(&SceneBody { scene: scene.as_str() })
        }
    }
    .map_err(|_| CommsError::RequestTooLarge)?;

    write!(
        url,
        "http://{}/api/{}/groups/{}/action",
        cfg.hue_bridge_host, cfg.hue_api_key, cfg.hue_group_id
    )
    .map_err(|_| CommsError::RequestTooLarge)?;
    let mut body: String<MAX_BODY_LEN> = String::new();
    body.push_str(&json).map_err(|()| CommsError::RequestTooLarge)?;

    Ok(HttpRequest {
        method: HttpMethod::Put,
        url,
        body,
    })
}

// ───────────────────────────────────────────────────────────────
// Producer side
// ───────────────────────────────────────────────────────────────

/// [`NetworkPort`] for the poll loop: enqueue without waiting.
pub struct HttpNetworkAdapter {
    tx: NetSender,
}

impl Default for HttpNetworkAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpNetworkAdapter {
    pub fn new() -> Self {
        Self {
            tx: NET_CHANNEL.sender(),
        }
    }
}

impl NetworkPort for HttpNetworkAdapter {
    fn send_command(&mut self, cmd: NetCommand) -> bool {
        match self.tx.try_send(cmd) {
            Ok(()) => {
                debug!("NET: queued {:?}", cmd);
                true
            }
            Err(_) => false,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Worker side
// ───────────────────────────────────────────────────────────────

/// Drain the command channel forever.  Runs on the protocol core.
pub fn run_network_worker(cfg: NetworkConfig) -> ! {
    let rx: NetReceiver = NET_CHANNEL.receiver();
    info!("Network worker started");
    loop {
        let cmd = futures_lite::future::block_on(rx.receive());
        if let Err(e) = execute(&cmd, &cfg) {
            warn!("NET: {:?} failed: {}", cmd, e);
        }
    }
}

fn execute(cmd: &NetCommand, cfg: &NetworkConfig) -> Result<(), CommsError> {
    let req = build_request(cmd, cfg)?;
    perform(&req)
}

#[cfg(target_os = "espidf")]
fn perform(req: &HttpRequest) -> Result<(), CommsError> {
    use esp_idf_svc::http::Method;
    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
    use esp_idf_svc::io::Write;

    let conf = Configuration {
        timeout: Some(core::time::Duration::from_secs(5)),
        ..Default::default()
    };
    let mut conn = EspHttpConnection::new(&conf).map_err(|_| CommsError::HttpFailed)?;

    let method = match req.method {
        HttpMethod::Get => Method::Get,
        HttpMethod::Put => Method::Put,
    };
    let mut len: String<8> = String::new();
    write!(len, "{}", req.body.len()).map_err(|_| CommsError::RequestTooLarge)?;
    let headers = [("Content-Type", "application/json"), ("Content-Length", len.as_str())];

    conn.initiate_request(method, &req.url, &headers)
        .map_err(|_| CommsError::HttpFailed)?;
    if !req.body.is_empty() {
        conn.write_all(req.body.as_bytes())
            .map_err(|_| CommsError::HttpFailed)?;
    }
    conn.initiate_response().map_err(|_| CommsError::HttpFailed)?;

    let status = conn.status();
    if !(200..300).contains(&status) {
        return Err(CommsError::HttpStatus(status));
    }
    info!("NET: {:?} {} -> {}", req.method, req.url, status);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn perform(req: &HttpRequest) -> Result<(), CommsError> {
    info!("NET (sim): {:?} {} {}", req.method, req.url, req.body);
    Ok(())
}
