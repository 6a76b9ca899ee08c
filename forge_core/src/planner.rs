//! Periodized plan generation.
//!
//! A plan is a macrocycle split into mesocycles (training phases) split
//! into one-week microcycles, with one routine per mesocycle. Plans are
//! built entirely in memory, then persisted as: macrocycle (inactive),
//! routines, activation. Activation is the only step that makes a plan
//! visible, so a failure anywhere before it leaves nothing active.

use crate::catalog::ExerciseCatalog;
use crate::config::PlanConfig;
use crate::store::PlanRepository;
use crate::{
    DeloadRecord, Error, Goal, Macrocycle, Mesocycle, Microcycle, MuscleGroup, PeriodizationType,
    Phase, PrescribedExercise, Result, Routine, RoutineDay, Split, TrainingLevel,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Longest plan the planner will lay out
pub const MAX_PLAN_MONTHS: u32 = 60;

/// Plan-shaping switches; unset fields fall back to `[plan]` config
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlanOptions {
    pub periodization_type: Option<PeriodizationType>,
    pub include_deloads: Option<bool>,
    /// Training weeks between deload weeks
    pub deload_frequency: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanRequest {
    pub name: String,
    pub goal: Goal,
    pub level: TrainingLevel,
    /// Sessions per week, 1..=7
    pub frequency: u32,
    pub duration_months: u32,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub options: PlanOptions,
}

/// A freshly created (and activated) plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanBundle {
    pub macrocycle: Macrocycle,
    pub routines: Vec<Routine>,
}

/// Where a user is inside their active plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivePlan {
    pub macrocycle: Macrocycle,
    pub mesocycle: Mesocycle,
    pub microcycle: Microcycle,
    pub routine: Option<Routine>,
}

pub struct PeriodizationPlanner<P> {
    repo: Arc<P>,
    catalog: Arc<dyn ExerciseCatalog>,
    params: PlanConfig,
}

impl<P: PlanRepository> PeriodizationPlanner<P> {
    pub fn new(repo: Arc<P>, catalog: Arc<dyn ExerciseCatalog>, params: PlanConfig) -> Self {
        Self {
            repo,
            catalog,
            params,
        }
    }

    /// Build, persist and activate a plan, deactivating the previous one
    pub fn create_plan(&self, user_id: &str, request: &PlanRequest) -> Result<PlanBundle> {
        let mut macrocycle = self.build_macrocycle(user_id, request)?;

        self.repo.insert_macrocycle(&macrocycle)?;

        let routines: Vec<Routine> = macrocycle
            .meso_cycles
            .iter()
            .enumerate()
            .map(|(i, meso)| self.build_routine(&macrocycle, meso, i + 1, request))
            .collect();

        let persisted = self
            .repo
            .insert_routines(&routines)
            .and_then(|_| self.repo.activate_macrocycle(user_id, macrocycle.id));
        if let Err(e) = persisted {
            tracing::warn!("Plan {} not activated ({}), rolling back", macrocycle.id, e);
            if let Err(cleanup) = self.repo.delete_macrocycle(user_id, macrocycle.id) {
                tracing::warn!("Rollback of plan {} failed: {}", macrocycle.id, cleanup);
            }
            return Err(e);
        }

        macrocycle.is_active = true;
        tracing::info!(
            "Plan '{}' for {}: {:?}, {} weeks in {} mesocycles",
            macrocycle.name,
            user_id,
            macrocycle.periodization_type,
            macrocycle.duration_weeks,
            macrocycle.meso_cycles.len()
        );
        Ok(PlanBundle {
            macrocycle,
            routines,
        })
    }

    /// Current mesocycle, week and routine; dates outside the plan clamp to its ends
    pub fn active_plan(&self, user_id: &str, today: NaiveDate) -> Result<Option<ActivePlan>> {
        let Some(macrocycle) = self.repo.active_macrocycle(user_id)? else {
            return Ok(None);
        };

        let weeks: Vec<(&Mesocycle, &Microcycle)> = macrocycle
            .meso_cycles
            .iter()
            .flat_map(|meso| meso.micro_cycles.iter().map(move |micro| (meso, micro)))
            .collect();

        let current = weeks
            .iter()
            .find(|(_, micro)| micro.start_date <= today && today <= micro.end_date)
            .or_else(|| {
                if today < macrocycle.start_date {
                    weeks.first()
                } else {
                    weeks.last()
                }
            })
            .map(|(meso, micro)| ((*meso).clone(), (*micro).clone()));

        let Some((mesocycle, microcycle)) = current else {
            return Ok(None);
        };

        let routine = self
            .repo
            .routines_for(macrocycle.id)?
            .into_iter()
            .find(|r| r.mesocycle_id == mesocycle.id);

        Ok(Some(ActivePlan {
            macrocycle,
            mesocycle,
            microcycle,
            routine,
        }))
    }

    pub fn record_deload(&self, user_id: &str, date: NaiveDate) -> Result<DeloadRecord> {
        let record = DeloadRecord {
            user_id: user_id.to_string(),
            date,
        };
        self.repo.record_deload(&record)?;
        tracing::info!("Deload recorded for {} on {}", user_id, date);
        Ok(record)
    }

    fn build_macrocycle(&self, user_id: &str, request: &PlanRequest) -> Result<Macrocycle> {
        if !(1..=MAX_PLAN_MONTHS).contains(&request.duration_months) {
            return Err(Error::validation(format!(
                "Plan duration must be 1-{} months (got {})",
                MAX_PLAN_MONTHS, request.duration_months
            )));
        }
        if !(1..=7).contains(&request.frequency) {
            return Err(Error::validation(format!(
                "Training frequency must be 1-7 sessions per week (got {})",
                request.frequency
            )));
        }

        let include_deloads = request
            .options
            .include_deloads
            .unwrap_or(self.params.include_deloads);
        let deload_frequency = request
            .options
            .deload_frequency
            .unwrap_or(self.params.deload_frequency);
        if include_deloads && deload_frequency == 0 {
            return Err(Error::validation("Deload frequency must be at least one week"));
        }

        let periodization_type = request
            .options
            .periodization_type
            .unwrap_or_else(|| periodization_for(request.goal));
        let total_weeks = (f64::from(request.duration_months) * self.params.weeks_per_month)
            .round()
            .max(1.0) as u32;
        let end_date = request
            .start_date
            .checked_add_signed(Duration::weeks(i64::from(total_weeks)))
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| {
                Error::validation(format!("Plan starting {} runs past the calendar", request.start_date))
            })?;
        let block_len = if include_deloads {
            deload_frequency
        } else {
            default_block_weeks(periodization_type)
        };

        let phases = phase_sequence(periodization_type);
        let mut week_number = 0;
        let meso_cycles: Vec<Mesocycle> = partition_weeks(total_weeks, block_len, include_deloads)
            .into_iter()
            .enumerate()
            .map(|(i, (weeks, includes_deload))| {
                let micro_cycles: Vec<Microcycle> = (0..weeks)
                    .map(|w| {
                        week_number += 1;
                        let start_date = week_start(request.start_date, week_number);
                        Microcycle {
                            id: Uuid::new_v4(),
                            week_number,
                            start_date,
                            end_date: start_date + Duration::days(6),
                            is_deload: includes_deload && w + 1 == weeks,
                        }
                    })
                    .collect();
                Mesocycle {
                    id: Uuid::new_v4(),
                    phase: phases[i % phases.len()],
                    start_date: micro_cycles[0].start_date,
                    end_date: micro_cycles[micro_cycles.len() - 1].end_date,
                    micro_cycles,
                    includes_deload,
                }
            })
            .collect();

        Ok(Macrocycle {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: request.name.clone(),
            duration_weeks: total_weeks,
            meso_cycles,
            primary_goal: request.goal,
            training_level: request.level,
            periodization_type,
            start_date: request.start_date,
            end_date,
            is_active: false,
        })
    }

    fn build_routine(
        &self,
        macrocycle: &Macrocycle,
        meso: &Mesocycle,
        number: usize,
        request: &PlanRequest,
    ) -> Routine {
        let split = split_for(request.frequency);
        let days = self.routine_days(split, request, meso.phase);
        let deload_days = if meso.includes_deload {
            self.routine_days(split, request, Phase::Deload)
        } else {
            Vec::new()
        };

        Routine {
            id: Uuid::new_v4(),
            macrocycle_id: macrocycle.id,
            mesocycle_id: meso.id,
            name: format!("{} - Mesocycle {} ({})", macrocycle.name, number, meso.phase),
            split,
            days,
            deload_days,
        }
    }

    /// `request.frequency` sessions cycling through the split's day layouts
    fn routine_days(&self, split: Split, request: &PlanRequest, phase: Phase) -> Vec<RoutineDay> {
        let (reps_low, reps_high, target_rir) = rep_scheme(request.goal, phase);
        let sets = sets_for(request.level, phase);
        let layouts = day_layouts(split);

        layouts
            .iter()
            .cycle()
            .take(request.frequency as usize)
            .enumerate()
            .map(|(i, (name, slots))| {
                let variant = i / layouts.len();
                let suffix = char::from(b'A' + variant as u8);
                let name = if phase == Phase::Deload {
                    format!("{} {} (deload)", name, suffix)
                } else {
                    format!("{} {}", name, suffix)
                };
                RoutineDay {
                    name,
                    exercises: self
                        .pick_exercises(slots, variant)
                        .into_iter()
                        .map(|exercise_id| PrescribedExercise {
                            exercise_id,
                            sets,
                            reps_low,
                            reps_high,
                            target_rir,
                        })
                        .collect(),
                }
            })
            .collect()
    }

    /// One exercise per slot; repeated groups and later variants rotate through the catalog
    fn pick_exercises(&self, slots: &[MuscleGroup], variant: usize) -> Vec<String> {
        let mut seen: HashMap<MuscleGroup, usize> = HashMap::new();
        let mut picked = Vec::new();
        for group in slots {
            let nth = seen.entry(*group).or_insert(0);
            let candidates = self.catalog.primary_exercises(*group);
            if !candidates.is_empty() {
                let exercise = candidates[(variant + *nth) % candidates.len()];
                if !picked.contains(&exercise.id) {
                    picked.push(exercise.id.clone());
                }
            }
            *nth += 1;
        }
        picked
    }
}

/// Template family of a goal
pub fn periodization_for(goal: Goal) -> PeriodizationType {
    match goal {
        Goal::Strength => PeriodizationType::Block,
        Goal::Hypertrophy => PeriodizationType::Linear,
        Goal::Endurance | Goal::GeneralFitness => PeriodizationType::Undulating,
    }
}

pub fn phase_sequence(kind: PeriodizationType) -> &'static [Phase] {
    match kind {
        PeriodizationType::Linear => &[Phase::Volume, Phase::Intensity, Phase::Peak],
        PeriodizationType::Block => &[Phase::Volume, Phase::Volume, Phase::Intensity, Phase::Peak],
        PeriodizationType::Undulating => &[Phase::Volume, Phase::Intensity],
    }
}

fn default_block_weeks(kind: PeriodizationType) -> u32 {
    match kind {
        PeriodizationType::Linear => 4,
        PeriodizationType::Block => 3,
        PeriodizationType::Undulating => 2,
    }
}

/// Split `total_weeks` into `(weeks, includes_deload)` mesocycles.
///
/// With deloads, every full block of `block_len` training weeks that is
/// followed by more plan gets one extra deload week. The last mesocycle
/// takes whatever is left. The weeks always add up to `total_weeks`.
pub fn partition_weeks(total_weeks: u32, block_len: u32, include_deloads: bool) -> Vec<(u32, bool)> {
    let block_len = block_len.max(1);
    let mut remaining = total_weeks;
    let mut parts = Vec::new();

    while remaining > 0 {
        let training = block_len.min(remaining);
        remaining -= training;
        if include_deloads && training == block_len && remaining > 0 {
            remaining -= 1;
            parts.push((training + 1, true));
        } else {
            parts.push((training, false));
        }
    }
    parts
}

fn week_start(plan_start: NaiveDate, week_number: u32) -> NaiveDate {
    plan_start + Duration::weeks(i64::from(week_number - 1))
}

pub fn split_for(frequency: u32) -> Split {
    match frequency {
        0..=3 => Split::FullBody,
        4 => Split::UpperLower,
        _ => Split::PushPullLegs,
    }
}

fn day_layouts(split: Split) -> &'static [(&'static str, &'static [MuscleGroup])] {
    use MuscleGroup::*;
    match split {
        Split::FullBody => &[("Full Body", &[Legs, Chest, Back, Shoulders, Core])],
        Split::UpperLower => &[
            ("Upper", &[Chest, Back, Shoulders, Back, Arms]),
            ("Lower", &[Legs, Glutes, Legs, Core]),
        ],
        Split::PushPullLegs => &[
            ("Push", &[Chest, Chest, Shoulders, Arms]),
            ("Pull", &[Back, Back, Shoulders, Arms]),
            ("Legs", &[Legs, Glutes, Legs, Core]),
        ],
    }
}

/// `(reps_low, reps_high, target_rir)`
fn rep_scheme(goal: Goal, phase: Phase) -> (u32, u32, u32) {
    match (goal, phase) {
        (Goal::Strength, Phase::Volume) => (5, 8, 2),
        (Goal::Strength, Phase::Intensity) => (3, 5, 2),
        (Goal::Strength, Phase::Peak) => (1, 3, 1),
        (Goal::Hypertrophy, Phase::Volume) => (8, 12, 2),
        (Goal::Hypertrophy, Phase::Intensity) => (6, 10, 1),
        (Goal::Hypertrophy, Phase::Peak) => (6, 8, 0),
        (Goal::Endurance, Phase::Volume) => (15, 20, 3),
        (Goal::Endurance, Phase::Intensity) => (12, 15, 2),
        (Goal::Endurance, Phase::Peak) => (10, 12, 1),
        (Goal::GeneralFitness, Phase::Volume) => (10, 15, 3),
        (Goal::GeneralFitness, Phase::Intensity) => (8, 12, 2),
        (Goal::GeneralFitness, Phase::Peak) => (6, 10, 2),
        (goal, Phase::Deload) => {
            let (low, high, rir) = rep_scheme(goal, Phase::Volume);
            (low, high, rir + 2)
        }
    }
}

fn sets_for(level: TrainingLevel, phase: Phase) -> u32 {
    let base: u32 = match level {
        TrainingLevel::Beginner => 3,
        TrainingLevel::Intermediate => 4,
        TrainingLevel::Advanced => 5,
    };
    match phase {
        Phase::Volume => base,
        Phase::Intensity => base.saturating_sub(1).max(2),
        Phase::Peak => base.saturating_sub(2).max(2),
        // Below every training phase, including peak
        Phase::Deload => base.saturating_sub(3).max(1),
    }
}
