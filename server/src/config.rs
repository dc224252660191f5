//! Tunables for the simulation and the relay server.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Simulation ticks per second. Every gameplay timer is counted in ticks.
pub const TICK_RATE: u32 = 60;

/// Simulation tunables. Missing fields in a config file fall back to the
/// desktop defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub width: f32,
    pub height: f32,
    /// Seed for every random roll made by the simulation.
    pub seed: u64,
    /// Ceiling on enemies spawned by a regular wave.
    pub enemy_capacity: u32,
    pub boss_interval: u32,
    pub wave_cooldown_ticks: u32,
    pub boss_spawn_delay_ticks: u32,
    pub powerup_drop_chance: f64,
    pub max_particles: usize,
    pub star_count: usize,
    /// Enemies spawned when a wave would otherwise be empty.
    pub min_wave_enemies: u32,
    pub effects_enabled: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            seed: 0x5EED_B011,
            enemy_capacity: 15,
            boss_interval: 10,
            wave_cooldown_ticks: 180,
            boss_spawn_delay_ticks: 120,
            powerup_drop_chance: 0.15,
            max_particles: 200,
            star_count: 100,
            min_wave_enemies: 5,
            effects_enabled: true,
        }
    }
}

impl SimulationConfig {
    /// Profile for touch/low-power devices: smaller waves.
    pub fn constrained() -> Self {
        Self {
            enemy_capacity: 10,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Rejects settings the simulation can't run with, such as a canvas with
    /// no area or a drop chance outside `0..=1`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("width", self.width), ("height", self.height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: value.to_string(),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.powerup_drop_chance) {
            return Err(ConfigError::OutOfRange {
                field: "powerup_drop_chance",
                value: self.powerup_drop_chance.to_string(),
            });
        }
        Ok(())
    }
}

/// Relay server settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS.
    pub client_url: String,
    pub match_timeout: Duration,
    pub sweep_interval: Duration,
    pub hit_radius: f64,
    pub bullet_damage: i32,
    pub max_health: i32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            client_url: "http://localhost:5173".to_string(),
            match_timeout: Duration::from_secs(10 * 60),
            sweep_interval: Duration::from_secs(60),
            hit_radius: 30.0,
            bullet_damage: 25,
            max_health: 100,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("BULLETCORE_SERVER_HOST").unwrap_or(defaults.host);
        let port = match lookup("BULLETCORE_SERVER_PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { value })?,
            None => defaults.port,
        };

        let client_host = lookup("CLIENT_HOST").unwrap_or_else(|| "localhost".to_string());
        let client_port = lookup("CLIENT_PORT").unwrap_or_else(|| "5173".to_string());
        let client_url = format!("http://{}:{}", client_host, client_port);

        let match_timeout = Duration::from_secs(parse_positive(
            &lookup,
            "MATCH_TIMEOUT_SECS",
            defaults.match_timeout.as_secs(),
        )?);
        let sweep_interval = Duration::from_secs(parse_positive(
            &lookup,
            "MATCH_SWEEP_SECS",
            defaults.sweep_interval.as_secs(),
        )?);
        let hit_radius = parse_positive(&lookup, "HIT_RADIUS", defaults.hit_radius)?;
        let bullet_damage = parse_positive(&lookup, "BULLET_DAMAGE", defaults.bullet_damage)?;
        let max_health = parse_positive(&lookup, "MATCH_MAX_HEALTH", defaults.max_health)?;

        Ok(Self {
            host,
            port,
            client_url,
            match_timeout,
            sweep_interval,
            hit_radius,
            bullet_damage,
            max_health,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match lookup(key) {
        Some(value) => match value.parse::<T>() {
            Ok(parsed) if parsed > T::default() => Ok(parsed),
            _ => Err(ConfigError::InvalidNumber { key, value }),
        },
        None => Ok(default),
    }
}
