//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub border: BorderConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub virus: VirusConfig,
    #[serde(default)]
    pub eject: EjectConfig,
}

/// Configuration values the simulation cannot run with.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Border must be at least {min}x{min}, got {width}x{height}")]
    BorderTooSmall { width: f64, height: f64, min: f64 },

    #[error("Tick interval must be non-zero")]
    ZeroTickInterval,

    #[error("Friction for {0} must be in (0, 1]")]
    InvalidFriction(&'static str),

    #[error("Player start mass must be positive and at least the minimum mass")]
    InvalidStartMass,

    #[error("Max cells must be at least 1")]
    ZeroMaxCells,

    #[error("Ejected mass must be positive and below the minimum eject mass")]
    InvalidEjectMass,

    #[error("{kind} radius {radius} must be positive and below half the border ({limit})")]
    InvalidRadius { kind: &'static str, radius: f64, limit: f64 },
}

/// Cells spawn this far from the border, so the world must fit two of them.
pub const SPAWN_MARGIN: f64 = 100.0;

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<Self>(&contents)?
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break world invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let min = SPAWN_MARGIN * 2.0;
        if !(self.border.width > min && self.border.height > min) {
            return Err(ConfigError::BorderTooSmall {
                width: self.border.width,
                height: self.border.height,
                min,
            });
        }
        if self.server.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if !(self.player.friction > 0.0 && self.player.friction <= 1.0) {
            return Err(ConfigError::InvalidFriction("cells"));
        }
        if !(self.food.friction > 0.0 && self.food.friction <= 1.0) {
            return Err(ConfigError::InvalidFriction("food"));
        }
        if !(self.player.start_mass > 0.0 && self.player.start_mass >= self.player.min_mass) {
            return Err(ConfigError::InvalidStartMass);
        }
        if self.player.max_cells == 0 {
            return Err(ConfigError::ZeroMaxCells);
        }
        if !(self.eject.mass > 0.0 && self.eject.mass < self.player.min_eject_mass) {
            return Err(ConfigError::InvalidEjectMass);
        }
        let limit = self.border.width.min(self.border.height) / 2.0;
        for (kind, radius) in [
            ("Food", self.food.radius),
            ("Virus", self.virus.radius),
            ("Ejected food", self.eject.radius),
        ] {
            if !(radius > 0.0 && radius < limit) {
                return Err(ConfigError::InvalidRadius { kind, radius, limit });
            }
        }
        Ok(())
    }
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Fixed RNG seed for reproducible worlds (random when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            tick_interval_ms: default_tick_interval(),
            seed: None,
        }
    }
}

fn default_port() -> u16 {
    8080
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    100
}
fn default_tick_interval() -> u64 {
    50
}

/// World border configuration. The world spans `[0, width] x [0, height]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BorderConfig {
    #[serde(default = "default_border_size")]
    pub width: f64,
    #[serde(default = "default_border_size")]
    pub height: f64,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            width: default_border_size(),
            height: default_border_size(),
        }
    }
}

fn default_border_size() -> f64 {
    2000.0
}

/// Player cell configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_start_mass")]
    pub start_mass: f64,
    /// Decay never takes a cell below this mass.
    #[serde(default = "default_player_min_mass")]
    pub min_mass: f64,
    #[serde(default = "default_player_max_cells")]
    pub max_cells: usize,
    /// Cells must be strictly larger than this radius to split.
    #[serde(default = "default_player_min_split_radius")]
    pub min_split_radius: f64,
    /// Cells must be strictly heavier than this to eject.
    #[serde(default = "default_player_min_eject_mass")]
    pub min_eject_mass: f64,
    /// Merge lockout after a split or burst.
    #[serde(default = "default_player_merge_time")]
    pub merge_time_ms: u64,
    /// Movement speed factor (scaled by radius^-0.439).
    #[serde(default = "default_player_speed")]
    pub speed: f64,
    /// Velocity given to the sibling cell of a split.
    #[serde(default = "default_player_split_speed")]
    pub split_speed: f64,
    /// Gap between a split cell's edge and its sibling's center.
    #[serde(default = "default_player_split_offset")]
    pub split_offset: f64,
    #[serde(default = "default_player_friction")]
    pub friction: f64,
    /// Fraction of mass lost per tick above `min_mass` (0 disables decay).
    #[serde(default = "default_player_decay_rate")]
    pub decay_rate: f64,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_mass: default_player_start_mass(),
            min_mass: default_player_min_mass(),
            max_cells: default_player_max_cells(),
            min_split_radius: default_player_min_split_radius(),
            min_eject_mass: default_player_min_eject_mass(),
            merge_time_ms: default_player_merge_time(),
            speed: default_player_speed(),
            split_speed: default_player_split_speed(),
            split_offset: default_player_split_offset(),
            friction: default_player_friction(),
            decay_rate: default_player_decay_rate(),
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_player_start_mass() -> f64 {
    100.0
}
fn default_player_min_mass() -> f64 {
    100.0
}
fn default_player_max_cells() -> usize {
    16
}
fn default_player_min_split_radius() -> f64 {
    15.0
}
fn default_player_min_eject_mass() -> f64 {
    100.0
}
fn default_player_merge_time() -> u64 {
    30_000
}
fn default_player_speed() -> f64 {
    10.0
}
fn default_player_split_speed() -> f64 {
    15.0
}
fn default_player_split_offset() -> f64 {
    5.0
}
fn default_player_friction() -> f64 {
    0.9
}
fn default_player_decay_rate() -> f64 {
    0.0005
}
fn default_max_name_length() -> usize {
    20
}

/// Food configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    /// Number of regular (non-ejected) food items kept in the world.
    #[serde(default = "default_food_target_count")]
    pub target_count: usize,
    #[serde(default = "default_food_radius")]
    pub radius: f64,
    #[serde(default = "default_food_friction")]
    pub friction: f64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            target_count: default_food_target_count(),
            radius: default_food_radius(),
            friction: default_food_friction(),
        }
    }
}

fn default_food_target_count() -> usize {
    500
}
fn default_food_radius() -> f64 {
    3.0
}
fn default_food_friction() -> f64 {
    0.95
}

/// Virus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirusConfig {
    /// Viruses spawned at world initialization.
    #[serde(default = "default_virus_count")]
    pub count: usize,
    #[serde(default = "default_virus_radius")]
    pub radius: f64,
    /// A cell bursts only when its radius exceeds this fraction of the virus radius.
    #[serde(default = "default_virus_burst_ratio")]
    pub burst_ratio: f64,
    /// Upper bound on pieces per burst.
    #[serde(default = "default_virus_max_splits")]
    pub max_splits: usize,
    /// One piece per this much cell radius.
    #[serde(default = "default_virus_split_radius_step")]
    pub split_radius_step: f64,
    /// Gap between a piece's edge and the virus center.
    #[serde(default = "default_virus_burst_offset")]
    pub burst_offset: f64,
    #[serde(default = "default_virus_burst_speed")]
    pub burst_speed: f64,
    /// Maximum random angle offset per piece, in radians.
    #[serde(default = "default_virus_burst_jitter")]
    pub burst_jitter: f64,
}

impl Default for VirusConfig {
    fn default() -> Self {
        Self {
            count: default_virus_count(),
            radius: default_virus_radius(),
            burst_ratio: default_virus_burst_ratio(),
            max_splits: default_virus_max_splits(),
            split_radius_step: default_virus_split_radius_step(),
            burst_offset: default_virus_burst_offset(),
            burst_speed: default_virus_burst_speed(),
            burst_jitter: default_virus_burst_jitter(),
        }
    }
}

fn default_virus_count() -> usize {
    10
}
fn default_virus_radius() -> f64 {
    35.0
}
fn default_virus_burst_ratio() -> f64 {
    0.6
}
fn default_virus_max_splits() -> usize {
    8
}
fn default_virus_split_radius_step() -> f64 {
    15.0
}
fn default_virus_burst_offset() -> f64 {
    10.0
}
fn default_virus_burst_speed() -> f64 {
    10.0
}
fn default_virus_burst_jitter() -> f64 {
    0.1
}

/// Ejected mass configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EjectConfig {
    /// Mass removed from the cell and carried by the ejected food.
    #[serde(default = "default_eject_mass")]
    pub mass: f64,
    #[serde(default = "default_eject_radius")]
    pub radius: f64,
    #[serde(default = "default_eject_speed")]
    pub speed: f64,
    /// Gap between the cell edge and the ejected food's center.
    #[serde(default = "default_eject_offset")]
    pub offset: f64,
}

impl Default for EjectConfig {
    fn default() -> Self {
        Self {
            mass: default_eject_mass(),
            radius: default_eject_radius(),
            speed: default_eject_speed(),
            offset: default_eject_offset(),
        }
    }
}

fn default_eject_mass() -> f64 {
    16.0
}
fn default_eject_radius() -> f64 {
    4.0
}
fn default_eject_speed() -> f64 {
    10.0
}
fn default_eject_offset() -> f64 {
    10.0
}
