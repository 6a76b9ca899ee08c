//! Weekly volume tracking against MEV/MAV/MRV landmarks.
//!
//! Landmarks are edited by the user or seeded from a per-level template;
//! `current_volume` is always recomputed from the workout log. Users who
//! never set up landmarks are judged against the default-level template.

use crate::catalog::ExerciseCatalog;
use crate::store::{LandmarkRepository, WorkoutLogRepository};
use crate::{
    Classification, Error, MuscleGroup, Result, TrainingLevel, VolumeLandmark, VolumeStatus,
    VolumeSummary, WorkoutLog,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct VolumeLandmarkTracker<R> {
    repo: Arc<R>,
    catalog: Arc<dyn ExerciseCatalog>,
    default_level: TrainingLevel,
}

impl<R: LandmarkRepository + WorkoutLogRepository> VolumeLandmarkTracker<R> {
    pub fn new(repo: Arc<R>, catalog: Arc<dyn ExerciseCatalog>, default_level: TrainingLevel) -> Self {
        Self {
            repo,
            catalog,
            default_level,
        }
    }

    pub fn get_landmark(&self, user_id: &str, group: MuscleGroup) -> Result<Option<VolumeLandmark>> {
        self.repo.load_landmark(user_id, group)
    }

    /// Create or replace a landmark; rejects `mev > mav` or `mav > mrv`
    pub fn upsert_landmark(&self, user_id: &str, landmark: VolumeLandmark) -> Result<VolumeLandmark> {
        if landmark.user_id != user_id {
            return Err(Error::validation(format!(
                "Landmark belongs to {}, not {}",
                landmark.user_id, user_id
            )));
        }
        landmark.validate()?;
        self.repo.save_landmark(&landmark)?;
        tracing::info!(
            "Landmarks for {}/{}: {} / {} / {}",
            user_id,
            landmark.muscle_group,
            landmark.mev,
            landmark.mav,
            landmark.mrv
        );
        Ok(landmark)
    }

    /// Seed every muscle group from the level template.
    ///
    /// Already computed `current_volume` values are kept.
    pub fn initialize_from_template(
        &self,
        user_id: &str,
        level: TrainingLevel,
    ) -> Result<Vec<VolumeLandmark>> {
        self.repo.seed_landmarks(&template_landmarks(user_id, level))?;
        let landmarks = self.repo.load_landmarks(user_id)?;
        tracing::info!("Initialized {} landmarks for {} ({:?})", landmarks.len(), user_id, level);
        Ok(landmarks)
    }

    /// Sets per week for `group` over the trailing window, written back
    pub fn compute_current_volume(
        &self,
        user_id: &str,
        group: MuscleGroup,
        window_weeks: u32,
        now: DateTime<Utc>,
    ) -> Result<f64> {
        let logs = self.window_logs(user_id, window_weeks, now)?;
        let volume = weekly_sets(&logs, self.catalog.as_ref(), window_weeks)
            .get(&group)
            .copied()
            .unwrap_or(0.0);

        let mut landmark = self.landmark_or_default(user_id, group)?;
        landmark.current_volume = volume;
        self.repo.record_volumes(std::slice::from_ref(&landmark))?;

        tracing::debug!("{}/{}: {:.1} sets/week", user_id, group, volume);
        Ok(volume)
    }

    /// Recompute every tracked group and write the volumes back.
    ///
    /// Untracked users get the default template, persisted only once they
    /// have sets in the window.
    pub fn refresh_all(
        &self,
        user_id: &str,
        window_weeks: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<VolumeLandmark>> {
        let (landmarks, tracked, trained) = self.current_landmarks(user_id, window_weeks, now)?;
        if tracked || trained {
            self.repo.record_volumes(&landmarks)?;
        }
        Ok(landmarks)
    }

    /// Summary with volumes recomputed from the log, without writing anything
    pub fn live_summary(
        &self,
        user_id: &str,
        window_weeks: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<VolumeSummary>> {
        let (landmarks, _, _) = self.current_landmarks(user_id, window_weeks, now)?;
        Ok(landmarks.iter().map(summarize).collect())
    }

    pub fn classify(&self, user_id: &str, group: MuscleGroup) -> Result<Classification> {
        Ok(classify_landmark(&self.landmark_or_default(user_id, group)?))
    }

    /// One row per tracked group, or the default template when none are tracked
    pub fn summarize_all(&self, user_id: &str) -> Result<Vec<VolumeSummary>> {
        let mut landmarks = self.repo.load_landmarks(user_id)?;
        if landmarks.is_empty() {
            landmarks = template_landmarks(user_id, self.default_level);
        }
        Ok(landmarks.iter().map(summarize).collect())
    }

    /// Landmarks with fresh volumes, whether the user tracks any, whether any set counted
    fn current_landmarks(
        &self,
        user_id: &str,
        window_weeks: u32,
        now: DateTime<Utc>,
    ) -> Result<(Vec<VolumeLandmark>, bool, bool)> {
        let logs = self.window_logs(user_id, window_weeks, now)?;
        let volumes = weekly_sets(&logs, self.catalog.as_ref(), window_weeks);

        let mut landmarks = self.repo.load_landmarks(user_id)?;
        let tracked = !landmarks.is_empty();
        if !tracked {
            landmarks = template_landmarks(user_id, self.default_level);
        }
        for landmark in &mut landmarks {
            landmark.current_volume = volumes.get(&landmark.muscle_group).copied().unwrap_or(0.0);
        }
        Ok((landmarks, tracked, !volumes.is_empty()))
    }

    fn landmark_or_default(&self, user_id: &str, group: MuscleGroup) -> Result<VolumeLandmark> {
        Ok(match self.repo.load_landmark(user_id, group)? {
            Some(lm) => lm,
            None => template_landmark(user_id, group, self.default_level),
        })
    }

    fn window_logs(
        &self,
        user_id: &str,
        window_weeks: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<WorkoutLog>> {
        if window_weeks == 0 {
            return Err(Error::validation("Volume window must be at least one week"));
        }
        let from = now
            .checked_sub_signed(Duration::weeks(i64::from(window_weeks)))
            .ok_or_else(|| Error::validation(format!("Volume window of {} weeks is out of range", window_weeks)))?;
        self.repo.logs_between(user_id, from, now)
    }
}

/// Sets per week per muscle group; an exercise counts for primary and secondary groups
pub fn weekly_sets(
    logs: &[WorkoutLog],
    catalog: &dyn ExerciseCatalog,
    window_weeks: u32,
) -> BTreeMap<MuscleGroup, f64> {
    let mut counts: BTreeMap<MuscleGroup, f64> = BTreeMap::new();
    for set in logs.iter().flat_map(|l| &l.completed_sets) {
        for group in catalog.muscle_groups(&set.exercise_id) {
            *counts.entry(group).or_insert(0.0) += 1.0;
        }
    }
    let weeks = f64::from(window_weeks.max(1));
    counts.values_mut().for_each(|c| *c /= weeks);
    counts
}

/// Status from the landmark ordering; monotonic in `current_volume`
pub fn volume_status(landmark: &VolumeLandmark) -> VolumeStatus {
    let current = landmark.current_volume;
    if current < landmark.mev {
        VolumeStatus::BelowMev
    } else if current <= landmark.mav {
        VolumeStatus::Optimal
    } else if current <= landmark.mrv {
        VolumeStatus::ApproachingMrv
    } else {
        VolumeStatus::ExceedingMrv
    }
}

pub fn classify_landmark(landmark: &VolumeLandmark) -> Classification {
    let status = volume_status(landmark);
    let group = landmark.muscle_group;
    let current = landmark.current_volume;

    let recommendation = match status {
        VolumeStatus::BelowMev => format!(
            "Add {} sets/week of {} to reach MEV ({}).",
            fmt_sets(landmark.mev - current),
            group,
            fmt_sets(landmark.mev)
        ),
        VolumeStatus::Optimal => format!(
            "{} volume is optimal; up to {} more sets/week stay within MAV ({}).",
            capitalize(group.as_str()),
            fmt_sets(landmark.mav - current),
            fmt_sets(landmark.mav)
        ),
        VolumeStatus::ApproachingMrv => format!(
            "Drop {} sets/week of {} to return to MAV ({}).",
            fmt_sets(current - landmark.mav),
            group,
            fmt_sets(landmark.mav)
        ),
        VolumeStatus::ExceedingMrv => format!(
            "Drop {} sets/week of {} to get back under MRV ({}).",
            fmt_sets(current - landmark.mrv),
            group,
            fmt_sets(landmark.mrv)
        ),
    };

    Classification {
        status,
        recommendation,
    }
}

pub fn summarize(landmark: &VolumeLandmark) -> VolumeSummary {
    let Classification {
        status,
        recommendation,
    } = classify_landmark(landmark);
    VolumeSummary {
        muscle_group: landmark.muscle_group,
        current_volume: landmark.current_volume,
        mev: landmark.mev,
        mav: landmark.mav,
        mrv: landmark.mrv,
        status,
        recommendation,
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Intermediate-level landmarks (weekly sets)
fn base_landmarks(group: MuscleGroup) -> (f64, f64, f64) {
    match group {
        MuscleGroup::Chest => (8.0, 16.0, 22.0),
        MuscleGroup::Back => (10.0, 18.0, 25.0),
        MuscleGroup::Shoulders => (8.0, 16.0, 22.0),
        MuscleGroup::Arms => (6.0, 14.0, 20.0),
        MuscleGroup::Legs => (8.0, 15.0, 20.0),
        MuscleGroup::Glutes => (4.0, 12.0, 16.0),
        MuscleGroup::Core => (4.0, 12.0, 16.0),
    }
}

fn level_scale(level: TrainingLevel) -> f64 {
    match level {
        TrainingLevel::Beginner => 0.75,
        TrainingLevel::Intermediate => 1.0,
        TrainingLevel::Advanced => 1.25,
    }
}

pub fn template_landmark(user_id: &str, group: MuscleGroup, level: TrainingLevel) -> VolumeLandmark {
    let (mev, mav, mrv) = base_landmarks(group);
    let scale = level_scale(level);
    VolumeLandmark {
        user_id: user_id.to_string(),
        muscle_group: group,
        mev: (mev * scale).round(),
        mav: (mav * scale).round(),
        mrv: (mrv * scale).round(),
        current_volume: 0.0,
    }
}

pub fn template_landmarks(user_id: &str, level: TrainingLevel) -> Vec<VolumeLandmark> {
    MuscleGroup::ALL
        .iter()
        .map(|g| template_landmark(user_id, *g, level))
        .collect()
}

fn fmt_sets(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
