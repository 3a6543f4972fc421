use std::env;
use std::time::Duration;

use crate::seed::ImpactPoint;

/// Which connection a person broadcast is withheld from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersonEchoExclusion {
    /// The connection that sent the person update.
    #[default]
    PersonOriginator,
    /// The connection that most recently sent a shape update (legacy behavior).
    ShapeOriginator,
}

impl PersonEchoExclusion {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "person" => Some(Self::PersonOriginator),
            "shape" => Some(Self::ShapeOriginator),
            _ => None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Length of one session countdown, in whole seconds.
    pub session_length_secs: u32,
    /// Cadence shared by the shape, person and time broadcasts.
    pub broadcast_interval_ms: u64,
    pub broadcast_capacity: usize,
    /// Inbound websocket frames above this size close the connection.
    pub max_message_bytes: usize,
    pub person_echo: PersonEchoExclusion,
    pub impact_points: Vec<ImpactPoint>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9001".to_string(),
            session_length_secs: 60,
            broadcast_interval_ms: 40, // 25 Hz
            broadcast_capacity: 64,
            max_message_bytes: 1024,
            person_echo: PersonEchoExclusion::default(),
            impact_points: default_impact_points(),
        }
    }
}

fn default_impact_points() -> Vec<ImpactPoint> {
    vec![
        ImpactPoint::new(375.0, 443.0, 5),
        ImpactPoint::new(380.0, 578.0, 5),
        ImpactPoint::new(502.0, 612.0, 6),
        ImpactPoint::new(920.0, 548.0, 5),
        ImpactPoint::new(608.0, 476.0, 5),
        ImpactPoint::new(705.0, 316.0, 5),
    ]
}

impl ServerConfig {
    /// Defaults overridden by whatever environment variables are set.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Ok(addr) = env::var("LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(secs) = parse_var("SESSION_LENGTH_SECS")? {
            config.session_length_secs = secs;
        }
        if let Some(ms) = parse_var("BROADCAST_INTERVAL_MS")? {
            config.broadcast_interval_ms = ms;
        }
        if let Some(bytes) = parse_var("MAX_MESSAGE_BYTES")? {
            config.max_message_bytes = bytes;
        }
        if let Ok(value) = env::var("PERSON_ECHO_EXCLUSION") {
            config.person_echo = PersonEchoExclusion::parse(&value).ok_or_else(|| {
                format!("PERSON_ECHO_EXCLUSION must be 'person' or 'shape', got '{value}'")
            })?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.trim().is_empty() {
            return Err("listen_addr must not be empty".to_string());
        }
        if self.broadcast_interval_ms == 0 {
            return Err("broadcast_interval_ms must be > 0".to_string());
        }
        if self.broadcast_capacity == 0 {
            return Err("broadcast_capacity must be > 0".to_string());
        }
        if self.max_message_bytes == 0 {
            return Err("max_message_bytes must be > 0".to_string());
        }
        for point in &self.impact_points {
            if !point.x.is_finite() || !point.y.is_finite() {
                return Err("impact point coordinates must be finite".to_string());
            }
        }
        Ok(())
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{name} has an invalid value: '{raw}'")),
        Err(_) => Ok(None),
    }
}
