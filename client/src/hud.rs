use crate::session::{ClientSession, ConnectionState};

pub fn connection_text(state: &ConnectionState) -> String {
    match state {
        ConnectionState::Connecting => "Connecting...".to_string(),
        ConnectionState::Connected => "Connected".to_string(),
        ConnectionState::Disconnected => "Disconnected, reconnecting...".to_string(),
        ConnectionState::Failed(reason) => {
            format!("Could not connect to the game session: {}", reason)
        }
    }
}

pub fn speed_text(speed_kmh: f64) -> String {
    let speed = if speed_kmh > 0.0 { speed_kmh } else { 0.0 };
    format!("{:.0} km/h", speed)
}

/// One-line overlay: connection, drivers, speed, version and fps.
pub fn status_line(session: &ClientSession, speed_kmh: Option<f64>, fps: f64) -> String {
    let mut parts = vec![connection_text(&session.state)];

    if let Some(world) = session.world() {
        parts.push(format!("Drivers: {}", world.len()));
    }
    if let Some(speed) = speed_kmh {
        parts.push(speed_text(speed));
    }
    if session.is_desynced() {
        parts.push("OUT OF SYNC".to_string());
    }
    parts.push(format!("Client: v{}", env!("CARGO_PKG_VERSION")));
    if !session.server_version.is_empty() {
        parts.push(format!("Server: v{}", session.server_version));
    }
    parts.push(format!("{:.0} fps", fps));

    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_names_the_reason() {
        let text = connection_text(&ConnectionState::Failed("session is full".to_string()));
        assert_eq!(text, "Could not connect to the game session: session is full");
    }

    #[test]
    fn speed_is_rounded_km_per_hour() {
        assert_eq!(speed_text(68.4), "68 km/h");
        assert_eq!(speed_text(-0.0), "0 km/h");
    }

    #[test]
    fn status_line_before_join() {
        let session = ClientSession::default();
        let line = status_line(&session, None, 59.6);
        assert!(line.starts_with("Connecting..."));
        assert!(!line.contains("Drivers"));
        assert!(!line.contains("km/h"));
        assert!(line.ends_with("60 fps"));
    }

    #[test]
    fn status_line_shows_speed() {
        let session = ClientSession::default();
        let line = status_line(&session, Some(36.0), 60.0);
        assert!(line.contains("36 km/h"));
    }
}
