//! Service configuration.
//!
//! Loads the settings the face agent itself needs. Room credentials live in
//! [`pixelface_session::SessionConfig`] and are loaded separately.

use std::env;
use std::time::Duration;
use tracing::Level;

/// Where the room bridge listens when `ROOM_BRIDGE_URL` is not set.
pub const DEFAULT_BRIDGE_URL: &str = "ws://127.0.0.1:7881/bridge";
/// Capacity of the bridge command and event channels.
pub const BRIDGE_CHANNEL_CAPACITY: usize = 256;
/// Capacity of the overlay command channel.
pub const UI_CHANNEL_CAPACITY: usize = 32;

const DEFAULT_FPS: u32 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub bridge_url: String,
    pub fps: u32,
    pub log_level: Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid frame rate provided for FACE_FPS: {0}")]
    InvalidFps(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `ROOM_BRIDGE_URL`: (Optional) WebSocket address of the room bridge.
    // *   `FACE_FPS`: (Optional) Frame clock rate, 1..=120. Defaults to 30.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bridge_url = lookup("ROOM_BRIDGE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BRIDGE_URL.to_string());

        let fps = match lookup("FACE_FPS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(fps) if (1..=120).contains(&fps) => fps,
                _ => return Err(ConfigError::InvalidFps(raw)),
            },
            None => DEFAULT_FPS,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            bridge_url,
            fps,
            log_level,
        })
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps
    }
}
