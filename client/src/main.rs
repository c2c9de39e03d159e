use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

use driving_client::bridge::PresentationBridge;
use driving_client::connection::ServerConnection;
use driving_client::frame::FrameContext;
use driving_client::hud;
use driving_client::input::InputState;
use driving_client::offline::OfflineSession;
use driving_client::scene::HeadlessScene;
use driving_client::session::ClientSession;
use driving_shared::VehicleConfig;

const DEFAULT_WS_URL: &str = "ws://127.0.0.1:9001/ws";
const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);
const HUD_INTERVAL: Duration = Duration::from_secs(1);
const OFFLINE_SEED: u32 = 2024;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if std::env::var("DRIVING_OFFLINE").is_ok_and(|v| v == "1") {
        run_offline();
        return;
    }

    let ws_url = match ws_url_from_env() {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Driving client v{} connecting to {}", env!("CARGO_PKG_VERSION"), ws_url);

    let connection = ServerConnection::new(ws_url);
    let mut session = ClientSession::default();
    let mut bridge: Option<PresentationBridge<HeadlessScene>> = None;
    let mut keys = InputState::default();
    let mut frame = FrameContext::new(Instant::now());
    let mut last_hud = Instant::now();

    loop {
        let now = Instant::now();
        frame.begin_frame(now);

        for event in connection.poll_events() {
            session.handle(event);
        }

        // One bridge per session identity.
        if bridge.as_ref().map(|b| b.local_id()) != session.local_id() {
            bridge = session
                .local_id()
                .map(|id| PresentationBridge::new(HeadlessScene::default(), id));
        }

        autopilot(&mut keys, frame.elapsed());

        let mut speed = None;
        if let Some(bridge) = bridge.as_mut() {
            let report = bridge.frame(session.world(), keys.to_inputs());
            if let Some(inputs) = report.outbound_inputs {
                connection.send_inputs(inputs);
            }
            speed = report.local_speed_kmh;
        }

        if now.duration_since(last_hud) >= HUD_INTERVAL {
            last_hud = now;
            tracing::info!(
                frames = frame.frame_count(),
                "{}",
                hud::status_line(&session, speed, frame.fps())
            );
        }

        std::thread::sleep(FRAME_INTERVAL.saturating_sub(now.elapsed()));
    }
}

/// Drive alone with no server. The frame clock's `dt` advances the world.
fn run_offline() {
    tracing::info!("Driving client v{} in offline mode", env!("CARGO_PKG_VERSION"));

    let mut offline = OfflineSession::new(
        HeadlessScene::default(),
        VehicleConfig::default(),
        OFFLINE_SEED,
    );
    let mut keys = InputState::default();
    let mut frame = FrameContext::new(Instant::now());
    let mut last_hud = Instant::now();

    loop {
        let now = Instant::now();
        let dt = frame.begin_frame(now);

        autopilot(&mut keys, frame.elapsed());
        let report = offline.step(dt, keys.to_inputs());

        if now.duration_since(last_hud) >= HUD_INTERVAL {
            last_hud = now;
            tracing::info!(
                frames = frame.frame_count(),
                "Offline | {} | {:.0} fps",
                hud::speed_text(report.local_speed_kmh.unwrap_or(0.0)),
                frame.fps()
            );
        }

        std::thread::sleep(FRAME_INTERVAL.saturating_sub(now.elapsed()));
    }
}

/// Drives laps without a keyboard: full throttle, turning left for two
/// seconds out of every six.
fn autopilot(keys: &mut InputState, elapsed: f64) {
    keys.release_all();
    keys.key_down("w");
    if elapsed % 6.0 >= 4.0 {
        keys.key_down("a");
    }
}

fn ws_url_from_env() -> Result<String, String> {
    let raw = std::env::var("DRIVING_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
    let url = url::Url::parse(&raw).map_err(|e| format!("invalid DRIVING_WS_URL {}: {}", raw, e))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url.to_string()),
        other => Err(format!("DRIVING_WS_URL must use ws or wss, got {}", other)),
    }
}
