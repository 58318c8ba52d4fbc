use crate::error::ConfigError;
use crate::flock_params::FlockParams;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How agents are kept inside the world after each step.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Coordinates are reduced modulo the world extent (toroidal world).
    #[default]
    Wrap,
    /// Coordinates are capped at the (inset) world bounds.
    Clamp,
    /// Coordinates are reflected off the (inset) bounds and velocity mirrored.
    Bounce,
}

/// Which neighbor finder the engine uses. Both return identical neighbor sets.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NeighborIndex {
    #[default]
    Pairwise,
    Grid,
}

// World extents and boundary handling
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    pub boundary: BoundaryPolicy,
    /// Inset margin for the clamp and bounce policies. Ignored when wrapping.
    pub border_buffer: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            width: 800.0,
            height: 600.0,
            boundary: BoundaryPolicy::Wrap,
            border_buffer: 10.0,
        }
    }
}

// Population and neighborhood settings
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FlockSettings {
    pub boid_count: u32,
    pub neighbor_radius: f32,
    pub max_velocity: f32,
    pub neighbor_index: NeighborIndex,
    /// Evaluate cohesion/alignment across the rayon thread pool.
    pub parallel: bool,
}

impl Default for FlockSettings {
    fn default() -> Self {
        FlockSettings {
            boid_count: 100,
            neighbor_radius: 50.0,
            max_velocity: 20.0,
            neighbor_index: NeighborIndex::Pairwise,
            parallel: true,
        }
    }
}

// Rule strengths and thresholds
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    pub safe_distance: f32,
    pub safe_distance_repel: f32,
    pub percent_to_center: f32,
    pub velocity_added: f32,
    /// Strength of the pull toward an externally supplied target point.
    pub percent_to_goal: f32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            safe_distance: 10.0,
            safe_distance_repel: 0.5,
            percent_to_center: 1.0 / 8.0,
            velocity_added: 1.0 / 8.0,
            percent_to_goal: 0.01,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct InitialConditions {
    /// Seed for initial placement. `None` draws a fresh seed from the OS.
    pub seed: Option<u64>,
}

// Settings for the headless driver loop
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub total_steps: u32,
    pub record_interval_steps: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig { total_steps: 600, record_interval_steps: 10 }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_positions: bool,
    pub save_stats: bool,
    pub save_agents_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "flock".to_string(),
            save_positions: true,
            save_stats: true,
            save_agents_in_snapshot: false,
            format: None,
        }
    }
}

/// Main flock configuration, loaded from a TOML file.
///
/// Every section and field falls back to its default, so a file only needs
/// to name the values it wants to override. Unknown keys are ignored.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct FlockConfig {
    pub world: WorldConfig,
    pub flock: FlockSettings,
    pub rules: RulesConfig,
    pub initial_conditions: InitialConditions,
    pub run: RunConfig,
    pub output: OutputConfig,
}

impl FlockConfig {
    /// Loads and validates the flock configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to load config from '{}': {}", path_ref.display(), e))?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: FlockConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the effective configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks every construction-time constraint on the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if self.flock.boid_count == 0 {
            return Err(ConfigError::invalid("boid_count must be greater than 0"));
        }
        if !(world.width.is_finite() && world.width > 0.0) {
            return Err(ConfigError::invalid(format!("world width must be positive, got {}", world.width)));
        }
        if !(world.height.is_finite() && world.height > 0.0) {
            return Err(ConfigError::invalid(format!("world height must be positive, got {}", world.height)));
        }
        require_non_negative("neighbor_radius", self.flock.neighbor_radius)?;
        require_non_negative("safe_distance", self.rules.safe_distance)?;
        require_non_negative("safe_distance_repel", self.rules.safe_distance_repel)?;
        require_non_negative("border_buffer", world.border_buffer)?;
        if !(self.flock.max_velocity.is_finite() && self.flock.max_velocity > 0.0) {
            return Err(ConfigError::invalid(format!(
                "max_velocity must be positive, got {}",
                self.flock.max_velocity
            )));
        }
        require_unit_interval("percent_to_center", self.rules.percent_to_center)?;
        require_unit_interval("velocity_added", self.rules.velocity_added)?;
        require_unit_interval("percent_to_goal", self.rules.percent_to_goal)?;

        if world.boundary != BoundaryPolicy::Wrap {
            let min_extent = world.width.min(world.height);
            if 2.0 * world.border_buffer >= min_extent {
                return Err(ConfigError::invalid(format!(
                    "border_buffer {} leaves no room inside a {}x{} world",
                    world.border_buffer, world.width, world.height
                )));
            }
        }
        Ok(())
    }

    /// Converts the configuration into the parameter block used every step.
    pub fn get_flock_params(&self) -> FlockParams {
        let safe_distance = self.rules.safe_distance;

        // Wrapping has no inset; the other policies keep agents off the edge.
        let border_buffer = match self.world.boundary {
            BoundaryPolicy::Wrap => 0.0,
            BoundaryPolicy::Clamp | BoundaryPolicy::Bounce => self.world.border_buffer,
        };

        FlockParams {
            world_width: self.world.width,
            world_height: self.world.height,
            boundary: self.world.boundary,
            border_buffer,
            boid_count: self.flock.boid_count,
            neighbor_radius: self.flock.neighbor_radius,
            neighbor_index: self.flock.neighbor_index,
            parallel: self.flock.parallel,
            safe_distance_sq: safe_distance * safe_distance,
            safe_distance_repel: self.rules.safe_distance_repel,
            percent_to_center: self.rules.percent_to_center,
            velocity_added: self.rules.velocity_added,
            percent_to_goal: self.rules.percent_to_goal,
            max_velocity: self.flock.max_velocity,
        }
    }
}

fn require_non_negative(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(format!("{} must be non-negative, got {}", name, value)))
    }
}

fn require_unit_interval(name: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(format!("{} must lie in [0, 1], got {}", name, value)))
    }
}
