// Configuration module for reading Agent.toml
// Every planner constant is tunable here; hardcoded defaults mirror the shipped file

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub timing: TimingConfig,
    pub aging: AgingConfig,
    pub safety: SafetyConfig,
    pub eating: EatingConfig,
    pub exploration: ExplorationConfig,
    pub survival: SurvivalConfig,
    pub mode: ModeConfig,
    pub debug: DebugConfig,
}

/// Per-step wall-clock budget
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    pub search_budget_ms: u64,
}

impl TimingConfig {
    pub fn search_budget(&self) -> Duration {
        Duration::from_millis(self.search_budget_ms)
    }
}

/// Visited-tile aging
#[derive(Debug, Deserialize, Clone)]
pub struct AgingConfig {
    pub growth_factor: f64,
    /// Aging runs on steps divisible by this value
    pub age_update_rate: u64,
    /// Cooldown given to freshly seen cells
    pub slow_down_effect: u32,
}

/// Flood-fill entrapment thresholds
#[derive(Debug, Deserialize, Clone)]
pub struct SafetyConfig {
    pub flood_fill_factor: f64,
    pub large_flood_fill_factor: f64,
    /// Body size above which `large_flood_fill_factor` applies
    pub large_size_cutoff: usize,
    /// Cap for the flood fill used by the degraded move choice
    pub probe_limit: usize,
}

impl SafetyConfig {
    /// Minimum reachable cells required after reaching a goal with a body of `size`
    pub fn threshold_for(&self, size: usize) -> usize {
        let factor = if size > self.large_size_cutoff {
            self.large_flood_fill_factor
        } else {
            self.flood_fill_factor
        };
        (size as f64 * factor).ceil() as usize
    }
}

/// Edge cost of entering a tile, per planner and goal type
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TileCosts {
    pub passage: f64,
    pub stone: f64,
    pub food: f64,
    pub super_food_wanted: f64,
    pub super_food_avoided: f64,
    pub visited: f64,
    pub enemy_supposition: f64,
    /// Visited cost shrinks by `(age - 1) * age_discount` ...
    pub age_discount: f64,
    /// ... but never by more than this
    pub max_age_discount: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EatingConfig {
    pub max_candidates: usize,
    pub food_costs: TileCosts,
    pub super_food_costs: TileCosts,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExplorationConfig {
    /// Minimum age for a visited cell to count as a goal
    pub stale_age: f64,
    pub max_candidates: usize,
    /// Extra depth explored past the first goal
    pub depth_slack: usize,
    pub costs: TileCosts,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SurvivalConfig {
    pub goal_depth: usize,
    /// Added to the safety threshold to cap leaf flood fills
    pub threshold_bonus: usize,
}

/// Mode selection, path cache and super-food intent
#[derive(Debug, Deserialize, Clone)]
pub struct ModeConfig {
    /// Cached paths are re-planned after this many consumed steps
    pub replan_interval: usize,
    /// From this step on super-food is always wanted
    pub late_game_step: u64,
    /// Super-food is wanted while the sight range is below this
    pub preferred_range: u32,
    /// Super-food is no longer wanted (before the late game) after eating this many
    pub max_super_food: u32,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Agent.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&contents).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Loads default configuration from Agent.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Agent.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Agent.toml
    pub fn default_hardcoded() -> Self {
        Config {
            timing: TimingConfig {
                search_budget_ms: 40,
            },
            aging: AgingConfig {
                growth_factor: 1.12,
                age_update_rate: 2,
                slow_down_effect: 3,
            },
            safety: SafetyConfig {
                flood_fill_factor: 1.8,
                large_flood_fill_factor: 1.4,
                large_size_cutoff: 80,
                probe_limit: 200,
            },
            eating: EatingConfig {
                max_candidates: 3,
                food_costs: TileCosts {
                    passage: 1.0,
                    stone: 6.0,
                    food: 0.0,
                    super_food_wanted: 2.0,
                    super_food_avoided: 15.0,
                    visited: 5.0,
                    enemy_supposition: 20.0,
                    age_discount: 0.5,
                    max_age_discount: 3.0,
                },
                super_food_costs: TileCosts {
                    passage: 1.0,
                    stone: 8.0,
                    food: 0.0,
                    super_food_wanted: 0.0,
                    super_food_avoided: 15.0,
                    visited: 6.0,
                    enemy_supposition: 20.0,
                    age_discount: 0.5,
                    max_age_discount: 3.0,
                },
            },
            exploration: ExplorationConfig {
                stale_age: 2.0,
                max_candidates: 5,
                depth_slack: 1,
                costs: TileCosts {
                    passage: 1.0,
                    stone: 5.0,
                    food: 1.0,
                    super_food_wanted: 0.0,
                    super_food_avoided: 25.0,
                    visited: 1.0,
                    enemy_supposition: 20.0,
                    age_discount: 0.0,
                    max_age_discount: 0.0,
                },
            },
            survival: SurvivalConfig {
                goal_depth: 3,
                threshold_bonus: 10,
            },
            mode: ModeConfig {
                replan_interval: 2,
                late_game_step: 2500,
                preferred_range: 4,
                max_super_food: 5,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "agent_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            log::warn!("Could not load Agent.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }
}
