use driving_shared::VehicleConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Tick events per second sent to every client
    pub tick_rate_hz: u32,
    /// Send a state checkpoint every N ticks (0 disables checkpoints)
    pub checkpoint_every_n: u32,
    /// Seed for spawn points; random per session when unset
    pub rng_seed: Option<u32>,
    pub max_participants: usize,
    /// Input messages accepted per client per second
    pub max_inputs_per_sec: u32,
    pub vehicle: VehicleConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9001".to_string(),
            tick_rate_hz: 60,
            checkpoint_every_n: 120,
            rng_seed: None,
            max_participants: 32,
            max_inputs_per_sec: 60,
            vehicle: VehicleConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `DRIVING_*` environment variables.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("DRIVING_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(v) = env_parse("DRIVING_TICK_RATE_HZ")? {
            config.tick_rate_hz = v;
        }
        if let Some(v) = env_parse("DRIVING_CHECKPOINT_EVERY")? {
            config.checkpoint_every_n = v;
        }
        if let Some(v) = env_parse("DRIVING_RNG_SEED")? {
            config.rng_seed = Some(v);
        }
        if let Some(v) = env_parse("DRIVING_MAX_PARTICIPANTS")? {
            config.max_participants = v;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > 240 {
            return Err("tick_rate_hz must be in 1..=240".to_string());
        }
        if self.max_participants == 0 {
            return Err("max_participants must be > 0".to_string());
        }
        if self.max_inputs_per_sec == 0 {
            return Err("max_inputs_per_sec must be > 0".to_string());
        }
        self.vehicle.validate()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(None),
    }
}
