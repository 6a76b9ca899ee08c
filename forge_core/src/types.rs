//! Core domain types for the training load engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Muscle groups, goals, training levels and phases
//! - Workout logs and completed sets
//! - Fatigue state and volume landmarks
//! - Macro/meso/micro cycles and generated routines
//! - Deload recommendations

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Taxonomy
// ============================================================================

/// Muscle groups tracked by the engine
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Arms,
    Legs,
    Glutes,
    Core,
}

impl MuscleGroup {
    pub const ALL: [MuscleGroup; 7] = [
        MuscleGroup::Chest,
        MuscleGroup::Back,
        MuscleGroup::Shoulders,
        MuscleGroup::Arms,
        MuscleGroup::Legs,
        MuscleGroup::Glutes,
        MuscleGroup::Core,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Arms => "arms",
            MuscleGroup::Legs => "legs",
            MuscleGroup::Glutes => "glutes",
            MuscleGroup::Core => "core",
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MuscleGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        MuscleGroup::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| Error::validation(format!("Unknown muscle group: {}", s)))
    }
}

/// Training experience of the user
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrainingLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl FromStr for TrainingLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(TrainingLevel::Beginner),
            "intermediate" => Ok(TrainingLevel::Intermediate),
            "advanced" => Ok(TrainingLevel::Advanced),
            other => Err(Error::validation(format!("Unknown training level: {}", other))),
        }
    }
}

/// Primary goal of a training plan
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Strength,
    Hypertrophy,
    Endurance,
    GeneralFitness,
}

impl FromStr for Goal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "strength" => Ok(Goal::Strength),
            "hypertrophy" => Ok(Goal::Hypertrophy),
            "endurance" => Ok(Goal::Endurance),
            "general_fitness" | "general" => Ok(Goal::GeneralFitness),
            other => Err(Error::validation(format!("Unknown goal: {}", other))),
        }
    }
}

/// Training phase of a mesocycle (or the focus of a single week)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Volume,
    Intensity,
    Peak,
    Deload,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Volume => "volume",
            Phase::Intensity => "intensity",
            Phase::Peak => "peak",
            Phase::Deload => "deload",
        };
        f.write_str(s)
    }
}

/// Template family deciding the phase sequence of a macrocycle
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PeriodizationType {
    Linear,
    Block,
    Undulating,
}

impl FromStr for PeriodizationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(PeriodizationType::Linear),
            "block" => Ok(PeriodizationType::Block),
            "undulating" | "dup" => Ok(PeriodizationType::Undulating),
            other => Err(Error::validation(format!(
                "Unknown periodization type: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Workout Log Types
// ============================================================================

/// A single logged set. Immutable once written.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletedSet {
    pub exercise_id: String,
    pub reps: u32,
    pub weight: f64,
    pub rir: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

/// One training session as recorded by the workout log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutLog {
    pub id: Uuid,
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub completed_sets: Vec<CompletedSet>,
}

// ============================================================================
// Fatigue
// ============================================================================

/// Accumulated fatigue of one user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFatigueState {
    pub user_id: String,
    pub current_fatigue: f64,
    pub baseline_fatigue: f64,
    /// Points recovered per rested day
    pub recovery_rate: f64,
    pub last_updated: DateTime<Utc>,
}

impl UserFatigueState {
    /// Fatigue above the user's baseline, never negative
    pub fn excess(&self) -> f64 {
        (self.current_fatigue - self.baseline_fatigue).max(0.0)
    }
}

/// Recency-weighted fatigue score per muscle group
pub type MuscleGroupFatigueMap = std::collections::BTreeMap<MuscleGroup, f64>;

// ============================================================================
// Volume Landmarks
// ============================================================================

/// MEV/MAV/MRV (weekly sets) for one muscle group of one user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VolumeLandmark {
    pub user_id: String,
    pub muscle_group: MuscleGroup,
    pub mev: f64,
    pub mav: f64,
    pub mrv: f64,
    /// Sets per week over the last computed window
    pub current_volume: f64,
}

impl VolumeLandmark {
    pub fn new(
        user_id: impl Into<String>,
        muscle_group: MuscleGroup,
        mev: f64,
        mav: f64,
        mrv: f64,
    ) -> Result<Self> {
        let landmark = Self {
            user_id: user_id.into(),
            muscle_group,
            mev,
            mav,
            mrv,
            current_volume: 0.0,
        };
        landmark.validate()?;
        Ok(landmark)
    }

    /// Check `0 <= mev <= mav <= mrv`
    pub fn validate(&self) -> Result<()> {
        let values = [self.mev, self.mav, self.mrv, self.current_volume];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Error::validation(format!(
                "Landmarks for {} must be finite and non-negative",
                self.muscle_group
            )));
        }
        if self.mev > self.mav || self.mav > self.mrv {
            return Err(Error::validation(format!(
                "Landmarks for {} must satisfy mev <= mav <= mrv (got {} / {} / {})",
                self.muscle_group, self.mev, self.mav, self.mrv
            )));
        }
        Ok(())
    }
}

/// Where current volume sits relative to the landmarks.
///
/// Variants are ordered from least to most volume.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStatus {
    BelowMev,
    Optimal,
    ApproachingMrv,
    ExceedingMrv,
}

impl fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VolumeStatus::BelowMev => "below_mev",
            VolumeStatus::Optimal => "optimal",
            VolumeStatus::ApproachingMrv => "approaching_mrv",
            VolumeStatus::ExceedingMrv => "exceeding_mrv",
        };
        f.write_str(s)
    }
}

/// Status plus human-readable advice
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub status: VolumeStatus,
    pub recommendation: String,
}

/// One dashboard row
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VolumeSummary {
    pub muscle_group: MuscleGroup,
    pub current_volume: f64,
    pub mev: f64,
    pub mav: f64,
    pub mrv: f64,
    pub status: VolumeStatus,
    pub recommendation: String,
}

// ============================================================================
// Periodization
// ============================================================================

/// One training week
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Microcycle {
    pub id: Uuid,
    /// 1-based position across the whole macrocycle
    pub week_number: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_deload: bool,
}

/// One training phase made of consecutive weeks
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Mesocycle {
    pub id: Uuid,
    pub phase: Phase,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub micro_cycles: Vec<Microcycle>,
    pub includes_deload: bool,
}

impl Mesocycle {
    pub fn weeks(&self) -> u32 {
        self.micro_cycles.len() as u32
    }
}

/// A whole periodized plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Macrocycle {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub duration_weeks: u32,
    pub meso_cycles: Vec<Mesocycle>,
    pub primary_goal: Goal,
    pub training_level: TrainingLevel,
    pub periodization_type: PeriodizationType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

/// Weekly session layout
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    FullBody,
    UpperLower,
    PushPullLegs,
}

/// An exercise slot inside a routine day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PrescribedExercise {
    pub exercise_id: String,
    pub sets: u32,
    pub reps_low: u32,
    pub reps_high: u32,
    pub target_rir: u32,
}

/// One session template inside a routine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutineDay {
    pub name: String,
    pub exercises: Vec<PrescribedExercise>,
}

/// Concrete workout routine generated for one mesocycle
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Routine {
    pub id: Uuid,
    pub macrocycle_id: Uuid,
    pub mesocycle_id: Uuid,
    pub name: String,
    pub split: Split,
    pub days: Vec<RoutineDay>,
    /// Reduced sessions for the mesocycle's deload week; empty without one
    #[serde(default)]
    pub deload_days: Vec<RoutineDay>,
}

impl Routine {
    /// Sessions to train during `week`
    pub fn days_for(&self, week: &Microcycle) -> &[RoutineDay] {
        if week.is_deload && !self.deload_days.is_empty() {
            &self.deload_days
        } else {
            &self.days
        }
    }
}

/// A deload the user actually took
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DeloadRecord {
    pub user_id: String,
    pub date: NaiveDate,
}

// ============================================================================
// Deload Recommendation
// ============================================================================

/// What gets reduced during a deload
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeloadType {
    Volume,
    Intensity,
    Full,
}

/// When the deload should start
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeloadTiming {
    Immediate,
    NextWeek,
    EndOfMesocycle,
}

/// Machine-readable explanation codes
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    FatigueAboveThreshold,
    VolumeNearMrv,
    VolumeExceedsMrv,
    ScheduledInterval,
    WithinRecoveryCapacity,
    NoDeloadHistory,
    InsufficientData,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DeloadRecommendation {
    pub should_deload: bool,
    pub deload_type: DeloadType,
    pub timing: DeloadTiming,
    pub reason_codes: Vec<ReasonCode>,
}

// ============================================================================
// Clock
// ============================================================================

/// Source of "now" for every time-dependent computation
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for reproducible runs and tests
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
