//! Configuration file support for Forge.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/forge/config.toml`.
//! Every tunable constant of the fatigue, load and deload heuristics lives
//! here rather than in the algorithms.

use crate::{Error, Result, TrainingLevel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub user: UserConfig,

    #[serde(default)]
    pub fatigue: FatigueConfig,

    #[serde(default)]
    pub load: LoadConfig,

    #[serde(default)]
    pub volume: VolumeConfig,

    #[serde(default)]
    pub plan: PlanConfig,

    #[serde(default)]
    pub deload: DeloadConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Which user the CLI acts for when `--user` is not given
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub id: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: default_user_id(),
        }
    }
}

/// Fatigue model parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FatigueConfig {
    #[serde(default = "default_initial_fatigue")]
    pub initial_fatigue: f64,

    #[serde(default = "default_baseline_fatigue")]
    pub baseline_fatigue: f64,

    /// Points recovered per rested day
    #[serde(default = "default_recovery_rate")]
    pub recovery_rate: f64,

    #[serde(default = "default_max_fatigue")]
    pub max_fatigue: f64,

    /// Intensity points contributed by one set taken far from failure
    #[serde(default = "default_per_set_points")]
    pub per_set_points: f64,

    /// RIR at or above which a set gets no proximity bonus
    #[serde(default = "default_rir_ceiling")]
    pub rir_ceiling: u32,

    /// Extra weight of a set taken to failure, relative to `per_set_points`
    #[serde(default = "default_rir_weight")]
    pub rir_weight: f64,

    /// RIR assumed when a set was logged without one
    #[serde(default = "default_assumed_rir")]
    pub assumed_rir: u32,

    /// Cap on the intensity a single workout can add
    #[serde(default = "default_max_intensity")]
    pub max_intensity: f64,
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            initial_fatigue: default_initial_fatigue(),
            baseline_fatigue: default_baseline_fatigue(),
            recovery_rate: default_recovery_rate(),
            max_fatigue: default_max_fatigue(),
            per_set_points: default_per_set_points(),
            rir_ceiling: default_rir_ceiling(),
            rir_weight: default_rir_weight(),
            assumed_rir: default_assumed_rir(),
            max_intensity: default_max_intensity(),
        }
    }
}

/// Working-weight recommendation parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Divisor of the reps-plus-RIR term in the 1RM estimate
    #[serde(default = "default_rep_divisor")]
    pub rep_divisor: f64,

    /// Fatigue excess that would halve the load, doubled
    #[serde(default = "default_fatigue_divisor")]
    pub fatigue_divisor: f64,

    #[serde(default = "default_discount_floor")]
    pub discount_floor: f64,

    #[serde(default = "default_plate_increment")]
    pub plate_increment: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            rep_divisor: default_rep_divisor(),
            fatigue_divisor: default_fatigue_divisor(),
            discount_floor: default_discount_floor(),
            plate_increment: default_plate_increment(),
        }
    }
}

/// Volume landmark tracking parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VolumeConfig {
    #[serde(default = "default_window_weeks")]
    pub window_weeks: u32,

    /// Template used for users that never initialized their landmarks
    #[serde(default = "default_training_level")]
    pub default_level: TrainingLevel,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            window_weeks: default_window_weeks(),
            default_level: default_training_level(),
        }
    }
}

/// Plan generation parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanConfig {
    #[serde(default = "default_weeks_per_month")]
    pub weeks_per_month: f64,

    #[serde(default = "default_include_deloads")]
    pub include_deloads: bool,

    /// Training weeks between planned deload weeks
    #[serde(default = "default_deload_frequency")]
    pub deload_frequency: u32,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            weeks_per_month: default_weeks_per_month(),
            include_deloads: default_include_deloads(),
            deload_frequency: default_deload_frequency(),
        }
    }
}

/// Deload advisor parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeloadConfig {
    #[serde(default = "default_fatigue_threshold")]
    pub fatigue_threshold: f64,

    /// Points above the threshold at which the deload starts immediately
    #[serde(default = "default_immediate_margin")]
    pub immediate_margin: f64,
}

impl Default for DeloadConfig {
    fn default() -> Self {
        Self {
            fatigue_threshold: default_fatigue_threshold(),
            immediate_margin: default_immediate_margin(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("forge")
}

fn default_user_id() -> String {
    "local".into()
}

fn default_initial_fatigue() -> f64 {
    30.0
}

fn default_baseline_fatigue() -> f64 {
    20.0
}

fn default_recovery_rate() -> f64 {
    5.0
}

fn default_max_fatigue() -> f64 {
    100.0
}

fn default_per_set_points() -> f64 {
    1.0
}

fn default_rir_ceiling() -> u32 {
    4
}

fn default_rir_weight() -> f64 {
    1.0
}

fn default_assumed_rir() -> u32 {
    2
}

fn default_max_intensity() -> f64 {
    40.0
}

fn default_rep_divisor() -> f64 {
    30.0
}

fn default_fatigue_divisor() -> f64 {
    400.0
}

fn default_discount_floor() -> f64 {
    0.85
}

fn default_plate_increment() -> f64 {
    2.5
}

fn default_window_weeks() -> u32 {
    1
}

fn default_training_level() -> TrainingLevel {
    TrainingLevel::Intermediate
}

fn default_weeks_per_month() -> f64 {
    4.0
}

fn default_include_deloads() -> bool {
    true
}

fn default_deload_frequency() -> u32 {
    4
}

fn default_fatigue_threshold() -> f64 {
    70.0
}

fn default_immediate_margin() -> f64 {
    15.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("forge").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject parameter combinations the heuristics cannot work with
    pub fn validate(&self) -> Result<()> {
        let f = &self.fatigue;
        if !(f.baseline_fatigue <= f.initial_fatigue && f.initial_fatigue <= f.max_fatigue) {
            return Err(Error::Config(
                "fatigue: expected baseline_fatigue <= initial_fatigue <= max_fatigue".into(),
            ));
        }
        if f.recovery_rate < 0.0 || f.rir_ceiling == 0 {
            return Err(Error::Config(
                "fatigue: recovery_rate must be >= 0 and rir_ceiling > 0".into(),
            ));
        }
        if self.load.rep_divisor <= 0.0
            || self.load.fatigue_divisor <= 0.0
            || self.load.plate_increment <= 0.0
        {
            return Err(Error::Config(
                "load: rep_divisor, fatigue_divisor and plate_increment must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.load.discount_floor) {
            return Err(Error::Config("load: discount_floor must be within 0..=1".into()));
        }
        if !(1..=52).contains(&self.volume.window_weeks) {
            return Err(Error::Config("volume: window_weeks must be within 1..=52".into()));
        }
        if !(self.plan.weeks_per_month > 0.0 && self.plan.weeks_per_month <= 5.0) {
            return Err(Error::Config("plan: weeks_per_month must be within (0, 5]".into()));
        }
        if self.plan.deload_frequency == 0 {
            return Err(Error::Config("plan: deload_frequency must be positive".into()));
        }
        Ok(())
    }
}
