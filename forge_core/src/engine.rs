//! Training engine facade.
//!
//! Wires every component to one store, one catalog and one clock, and
//! exposes the operations a front end calls. Each request builds a fresh
//! [`TrainingLoadContext`] from committed state; nothing is cached.

use crate::catalog::{build_default_catalog, ExerciseCatalog};
use crate::context::TrainingLoadContext;
use crate::deload::{DeloadAdvisor, DeloadSchedule};
use crate::fatigue::FatigueTracker;
use crate::load::LoadRecommender;
use crate::muscle_fatigue::MuscleGroupFatigueAnalyzer;
use crate::planner::{ActivePlan, PeriodizationPlanner, PlanBundle, PlanRequest};
use crate::store::Store;
use crate::volume::VolumeLandmarkTracker;
use crate::{
    Clock, Config, DeloadRecommendation, DeloadRecord, Error, Goal, MuscleGroupFatigueMap, Result,
    SystemClock, TrainingLevel, UserFatigueState, VolumeLandmark, VolumeSummary, WorkoutLog,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Result of logging a workout
#[derive(Clone, Debug, Serialize)]
pub struct LoggedWorkout {
    pub intensity: f64,
    pub fatigue: UserFatigueState,
    pub volume: Vec<VolumeSummary>,
}

/// The active plan as of today, with a fresh deload check
#[derive(Clone, Debug, Serialize)]
pub struct PlanStatus {
    #[serde(flatten)]
    pub plan: ActivePlan,
    pub deload_recommendation: DeloadRecommendation,
}

pub struct TrainingEngine<S> {
    store: Arc<S>,
    config: Config,
    catalog: Arc<dyn ExerciseCatalog>,
    clock: Arc<dyn Clock>,
    fatigue: FatigueTracker<S>,
    load: LoadRecommender<S>,
    volume: VolumeLandmarkTracker<S>,
    planner: PeriodizationPlanner<S>,
    deload: DeloadAdvisor,
}

impl<S: Store> TrainingEngine<S> {
    /// Engine over the built-in catalog and the wall clock
    pub fn new(store: Arc<S>, config: Config) -> Self {
        Self::with_parts(
            store,
            config,
            Arc::new(build_default_catalog()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        store: Arc<S>,
        config: Config,
        catalog: Arc<dyn ExerciseCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fatigue: FatigueTracker::new(store.clone(), clock.clone(), config.fatigue.clone()),
            load: LoadRecommender::new(store.clone(), config.load.clone()),
            volume: VolumeLandmarkTracker::new(
                store.clone(),
                catalog.clone(),
                config.volume.default_level,
            ),
            planner: PeriodizationPlanner::new(store.clone(), catalog.clone(), config.plan.clone()),
            deload: DeloadAdvisor::new(config.deload.clone()),
            store,
            config,
            catalog,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Fatigue
    // ------------------------------------------------------------------

    pub fn get_user_fatigue(&self, user_id: &str) -> UserFatigueState {
        self.fatigue.get_fatigue(user_id)
    }

    pub fn apply_workout_fatigue(&self, user_id: &str, intensity: f64) -> Result<UserFatigueState> {
        self.fatigue.apply_workout(user_id, intensity)
    }

    pub fn apply_rest_fatigue(&self, user_id: &str, days: f64) -> Result<UserFatigueState> {
        self.fatigue.apply_rest(user_id, days)
    }

    /// Append a workout, add its fatigue and refresh weekly volume.
    ///
    /// The log is the source of truth: once it is appended, a failure in
    /// the derived updates is reported but the workout stays logged.
    pub fn log_workout(&self, log: &WorkoutLog) -> Result<LoggedWorkout> {
        validate_log(log)?;
        for set in &log.completed_sets {
            if self.catalog.exercise(&set.exercise_id).is_none() {
                tracing::warn!("Unknown exercise '{}' logged; it loads no muscle group", set.exercise_id);
            }
        }

        self.store.append_log(log)?;

        let intensity = self.fatigue.intensity_for(log);
        let fatigue = self.fatigue.apply_workout(&log.user_id, intensity)?;
        let landmarks = self
            .volume
            .refresh_all(&log.user_id, self.config.volume.window_weeks, self.now())?;

        tracing::info!(
            "Logged workout {} for {}: {} sets, intensity {:.1}",
            log.id,
            log.user_id,
            log.completed_sets.len(),
            intensity
        );
        Ok(LoggedWorkout {
            intensity,
            fatigue,
            volume: landmarks.iter().map(crate::volume::summarize).collect(),
        })
    }

    // ------------------------------------------------------------------
    // Load and muscle fatigue
    // ------------------------------------------------------------------

    pub fn recommend_load(
        &self,
        user_id: &str,
        exercise_id: &str,
        target_reps: u32,
        target_rir: u32,
    ) -> Result<Option<f64>> {
        let ctx = self.build_context(user_id);
        self.load.recommend(&ctx, exercise_id, target_reps, target_rir)
    }

    /// Score the given logs; logs of other users are ignored
    pub fn analyze_muscle_group_fatigue(
        &self,
        user_id: &str,
        logs: &[WorkoutLog],
    ) -> MuscleGroupFatigueMap {
        MuscleGroupFatigueAnalyzer::new(self.catalog.as_ref()).analyze(user_id, logs, self.now())
    }

    /// Score the user's logs of the trailing `days` days
    pub fn recent_muscle_group_fatigue(
        &self,
        user_id: &str,
        days: u32,
    ) -> Result<MuscleGroupFatigueMap> {
        let now = self.now();
        let from = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| Error::validation(format!("Look-back of {} days is out of range", days)))?;
        let logs = self.store.logs_between(user_id, from, now)?;
        Ok(self.analyze_muscle_group_fatigue(user_id, &logs))
    }

    // ------------------------------------------------------------------
    // Volume
    // ------------------------------------------------------------------

    /// Recompute volumes from the log and summarize every tracked group.
    ///
    /// Storing the fresh volumes is best effort; a failed write still
    /// returns the computed summary.
    pub fn get_volume_summary(&self, user_id: &str) -> Result<Vec<VolumeSummary>> {
        let window_weeks = self.config.volume.window_weeks;
        let now = self.now();
        match self.volume.refresh_all(user_id, window_weeks, now) {
            Ok(landmarks) => Ok(landmarks.iter().map(crate::volume::summarize).collect()),
            Err(e) => {
                tracing::warn!("Volumes for {} not stored: {}", user_id, e);
                self.volume.live_summary(user_id, window_weeks, now)
            }
        }
    }

    pub fn initialize_landmarks(
        &self,
        user_id: &str,
        level: TrainingLevel,
    ) -> Result<Vec<VolumeLandmark>> {
        self.volume.initialize_from_template(user_id, level)?;
        self.volume
            .refresh_all(user_id, self.config.volume.window_weeks, self.now())
    }

    pub fn upsert_landmark(&self, user_id: &str, landmark: VolumeLandmark) -> Result<VolumeLandmark> {
        self.volume.upsert_landmark(user_id, landmark)
    }

    pub fn volume_tracker(&self) -> &VolumeLandmarkTracker<S> {
        &self.volume
    }

    // ------------------------------------------------------------------
    // Plans and deloads
    // ------------------------------------------------------------------

    pub fn create_periodized_plan(&self, user_id: &str, request: &PlanRequest) -> Result<PlanBundle> {
        self.planner.create_plan(user_id, request)
    }

    /// Today's position in the active plan; `None` without an active plan
    pub fn get_active_plan(&self, user_id: &str) -> Result<Option<PlanStatus>> {
        let Some(plan) = self.planner.active_plan(user_id, self.today())? else {
            return Ok(None);
        };

        // Planned deload weeks already cover the calendar; only react to load
        let schedule = DeloadSchedule {
            auto_regulated: true,
            ..self.default_schedule(plan.macrocycle.training_level)
        };
        let deload_recommendation = self.recommend_deload(
            user_id,
            plan.macrocycle.training_level,
            plan.macrocycle.primary_goal,
            &schedule,
        );

        Ok(Some(PlanStatus {
            plan,
            deload_recommendation,
        }))
    }

    /// Never fails: unreadable inputs count as missing data
    pub fn recommend_deload(
        &self,
        user_id: &str,
        level: TrainingLevel,
        goal: Goal,
        schedule: &DeloadSchedule,
    ) -> DeloadRecommendation {
        let ctx = self.build_context(user_id);
        self.deload.analyze_and_recommend(&ctx, level, goal, schedule)
    }

    /// Level defaults with the configured fatigue threshold
    pub fn default_schedule(&self, level: TrainingLevel) -> DeloadSchedule {
        DeloadSchedule {
            fatigue_threshold: self.config.deload.fatigue_threshold,
            ..DeloadSchedule::for_level(level)
        }
    }

    /// Persist a deload the user took (today when `date` is `None`)
    pub fn record_deload(&self, user_id: &str, date: Option<NaiveDate>) -> Result<DeloadRecord> {
        self.planner
            .record_deload(user_id, date.unwrap_or_else(|| self.today()))
    }

    // ------------------------------------------------------------------
    // Context
    // ------------------------------------------------------------------

    /// Snapshot of the user's load as of now.
    ///
    /// Read failures degrade to "no data" with a warning, like fatigue reads.
    pub fn build_context(&self, user_id: &str) -> TrainingLoadContext {
        let now = self.now();
        let fatigue = self.fatigue.get_fatigue(user_id);

        let volume = self
            .volume
            .live_summary(user_id, self.config.volume.window_weeks, now)
            .unwrap_or_else(|e| {
                tracing::warn!("Volume unavailable for {}: {}", user_id, e);
                Vec::new()
            });

        let has_history = self
            .store
            .logs_between(user_id, DateTime::<Utc>::MIN_UTC, now)
            .map(|logs| !logs.is_empty())
            .unwrap_or_else(|e| {
                tracing::warn!("Workout log unavailable for {}: {}", user_id, e);
                false
            });

        let weeks_since_deload = self
            .deload_reference(user_id)
            .unwrap_or_else(|e| {
                tracing::warn!("Deload history unavailable for {}: {}", user_id, e);
                None
            })
            .map(|since| ((now.date_naive() - since).num_days().max(0) / 7) as u32);

        TrainingLoadContext {
            user_id: user_id.to_string(),
            as_of: now,
            fatigue,
            volume,
            weeks_since_deload,
            has_history,
        }
    }

    /// Last recorded deload, else the start of the active plan
    fn deload_reference(&self, user_id: &str) -> Result<Option<NaiveDate>> {
        if let Some(date) = self.store.last_deload(user_id)? {
            return Ok(Some(date));
        }
        Ok(self
            .store
            .active_macrocycle(user_id)?
            .map(|m| m.start_date))
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

fn validate_log(log: &WorkoutLog) -> Result<()> {
    if log.user_id.trim().is_empty() {
        return Err(Error::validation("Workout log has no user"));
    }
    for set in &log.completed_sets {
        if set.exercise_id.trim().is_empty() {
            return Err(Error::validation("Logged set has no exercise"));
        }
        if !set.weight.is_finite() || set.weight < 0.0 {
            return Err(Error::validation(format!(
                "Weight for {} must be a non-negative number (got {})",
                set.exercise_id, set.weight
            )));
        }
    }
    Ok(())
}
