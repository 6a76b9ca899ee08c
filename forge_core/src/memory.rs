//! In-process store.
//!
//! Backs tests and hosts that keep their own persistence outside the
//! engine. All data sits behind one `RwLock`, so multi-record transitions
//! such as plan activation are a single critical section.

use crate::store::{FatigueRepository, LandmarkRepository, PlanRepository, WorkoutLogRepository};
use crate::{
    DeloadRecord, Error, Macrocycle, MuscleGroup, Result, Routine, UserFatigueState,
    VolumeLandmark, WorkoutLog,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Everything a store keeps, in serializable form.
///
/// Shared with the file store, which persists it as one JSON document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(default)]
    pub fatigue: HashMap<String, UserFatigueState>,

    #[serde(default)]
    pub landmarks: HashMap<String, BTreeMap<MuscleGroup, VolumeLandmark>>,

    #[serde(default)]
    pub macrocycles: Vec<Macrocycle>,

    #[serde(default)]
    pub routines: Vec<Routine>,

    #[serde(default)]
    pub deloads: Vec<DeloadRecord>,
}

impl EngineState {
    pub(crate) fn insert_macrocycle(&mut self, macrocycle: &Macrocycle) -> Result<()> {
        if self.macrocycles.iter().any(|m| m.id == macrocycle.id) {
            return Err(Error::Conflict(format!(
                "Macrocycle {} already exists",
                macrocycle.id
            )));
        }
        if macrocycle.is_active
            && self
                .macrocycles
                .iter()
                .any(|m| m.user_id == macrocycle.user_id && m.is_active)
        {
            return Err(Error::Conflict(format!(
                "User {} already has an active macrocycle",
                macrocycle.user_id
            )));
        }
        self.macrocycles.push(macrocycle.clone());
        Ok(())
    }

    pub(crate) fn delete_macrocycle(&mut self, user_id: &str, macrocycle_id: Uuid) {
        self.macrocycles
            .retain(|m| !(m.user_id == user_id && m.id == macrocycle_id));
        self.routines.retain(|r| r.macrocycle_id != macrocycle_id);
    }

    pub(crate) fn activate_macrocycle(&mut self, user_id: &str, macrocycle_id: Uuid) -> Result<()> {
        if !self
            .macrocycles
            .iter()
            .any(|m| m.user_id == user_id && m.id == macrocycle_id)
        {
            return Err(Error::NotFound(format!(
                "Macrocycle {} of user {}",
                macrocycle_id, user_id
            )));
        }
        for m in self.macrocycles.iter_mut().filter(|m| m.user_id == user_id) {
            m.is_active = m.id == macrocycle_id;
        }
        Ok(())
    }

    pub(crate) fn active_macrocycle(&self, user_id: &str) -> Option<Macrocycle> {
        self.macrocycles
            .iter()
            .find(|m| m.user_id == user_id && m.is_active)
            .cloned()
    }

    pub(crate) fn routines_for(&self, macrocycle_id: Uuid) -> Vec<Routine> {
        self.routines
            .iter()
            .filter(|r| r.macrocycle_id == macrocycle_id)
            .cloned()
            .collect()
    }

    pub(crate) fn last_deload(&self, user_id: &str) -> Option<NaiveDate> {
        self.deloads
            .iter()
            .filter(|d| d.user_id == user_id)
            .map(|d| d.date)
            .max()
    }

    pub(crate) fn landmarks_of(&self, user_id: &str) -> Vec<VolumeLandmark> {
        self.landmarks
            .get(user_id)
            .map(|by_group| by_group.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn put_landmark(&mut self, landmark: &VolumeLandmark) {
        self.landmarks
            .entry(landmark.user_id.clone())
            .or_default()
            .insert(landmark.muscle_group, landmark.clone());
    }

    /// Overwrite `current_volume` only; groups not stored yet are inserted whole
    pub(crate) fn record_volumes(&mut self, landmarks: &[VolumeLandmark]) {
        for landmark in landmarks {
            self.landmarks
                .entry(landmark.user_id.clone())
                .or_default()
                .entry(landmark.muscle_group)
                .and_modify(|stored| stored.current_volume = landmark.current_volume)
                .or_insert_with(|| landmark.clone());
        }
    }

    /// Overwrite the thresholds only; a stored `current_volume` survives
    pub(crate) fn seed_landmarks(&mut self, landmarks: &[VolumeLandmark]) {
        for landmark in landmarks {
            self.landmarks
                .entry(landmark.user_id.clone())
                .or_default()
                .entry(landmark.muscle_group)
                .and_modify(|stored| {
                    stored.mev = landmark.mev;
                    stored.mav = landmark.mav;
                    stored.mrv = landmark.mrv;
                })
                .or_insert_with(|| landmark.clone());
        }
    }
}

/// Store keeping everything in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<EngineState>,
    logs: RwLock<Vec<WorkoutLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything except the workout logs
    pub fn snapshot(&self) -> Result<EngineState> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, EngineState>> {
        self.state
            .read()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, EngineState>> {
        self.state
            .write()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }
}

impl FatigueRepository for MemoryStore {
    fn load_fatigue(&self, user_id: &str) -> Result<Option<UserFatigueState>> {
        Ok(self.read()?.fatigue.get(user_id).cloned())
    }

    fn save_fatigue(&self, state: &UserFatigueState) -> Result<()> {
        self.write()?
            .fatigue
            .insert(state.user_id.clone(), state.clone());
        Ok(())
    }
}

impl LandmarkRepository for MemoryStore {
    fn load_landmark(&self, user_id: &str, group: MuscleGroup) -> Result<Option<VolumeLandmark>> {
        Ok(self
            .read()?
            .landmarks
            .get(user_id)
            .and_then(|by_group| by_group.get(&group))
            .cloned())
    }

    fn load_landmarks(&self, user_id: &str) -> Result<Vec<VolumeLandmark>> {
        Ok(self.read()?.landmarks_of(user_id))
    }

    fn save_landmark(&self, landmark: &VolumeLandmark) -> Result<()> {
        self.write()?.put_landmark(landmark);
        Ok(())
    }

    fn save_landmarks(&self, landmarks: &[VolumeLandmark]) -> Result<()> {
        let mut state = self.write()?;
        for landmark in landmarks {
            state.put_landmark(landmark);
        }
        Ok(())
    }

    fn record_volumes(&self, landmarks: &[VolumeLandmark]) -> Result<()> {
        self.write()?.record_volumes(landmarks);
        Ok(())
    }

    fn seed_landmarks(&self, landmarks: &[VolumeLandmark]) -> Result<()> {
        self.write()?.seed_landmarks(landmarks);
        Ok(())
    }
}

impl PlanRepository for MemoryStore {
    fn insert_macrocycle(&self, macrocycle: &Macrocycle) -> Result<()> {
        self.write()?.insert_macrocycle(macrocycle)
    }

    fn delete_macrocycle(&self, user_id: &str, macrocycle_id: Uuid) -> Result<()> {
        self.write()?.delete_macrocycle(user_id, macrocycle_id);
        Ok(())
    }

    fn insert_routines(&self, routines: &[Routine]) -> Result<()> {
        self.write()?.routines.extend(routines.iter().cloned());
        Ok(())
    }

    fn activate_macrocycle(&self, user_id: &str, macrocycle_id: Uuid) -> Result<()> {
        self.write()?.activate_macrocycle(user_id, macrocycle_id)
    }

    fn active_macrocycle(&self, user_id: &str) -> Result<Option<Macrocycle>> {
        Ok(self.read()?.active_macrocycle(user_id))
    }

    fn routines_for(&self, macrocycle_id: Uuid) -> Result<Vec<Routine>> {
        Ok(self.read()?.routines_for(macrocycle_id))
    }

    fn record_deload(&self, record: &DeloadRecord) -> Result<()> {
        self.write()?.deloads.push(record.clone());
        Ok(())
    }

    fn last_deload(&self, user_id: &str) -> Result<Option<NaiveDate>> {
        Ok(self.read()?.last_deload(user_id))
    }
}

impl WorkoutLogRepository for MemoryStore {
    fn append_log(&self, log: &WorkoutLog) -> Result<()> {
        self.logs
            .write()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))?
            .push(log.clone());
        Ok(())
    }

    fn logs_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkoutLog>> {
        let logs = self
            .logs
            .read()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))?;
        let mut found: Vec<_> = logs
            .iter()
            .filter(|l| l.user_id == user_id && l.date >= from && l.date <= to)
            .cloned()
            .collect();
        found.sort_by_key(|l| l.date);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Goal, PeriodizationType, TrainingLevel};
    use chrono::TimeZone;

    fn macrocycle(user_id: &str, active: bool) -> Macrocycle {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Macrocycle {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            name: "test".into(),
            duration_weeks: 0,
            meso_cycles: vec![],
            primary_goal: Goal::Strength,
            training_level: TrainingLevel::Beginner,
            periodization_type: PeriodizationType::Linear,
            start_date: start,
            end_date: start,
            is_active: active,
        }
    }

    #[test]
    fn test_second_active_insert_conflicts() {
        let store = MemoryStore::new();
        store.insert_macrocycle(&macrocycle("u1", true)).unwrap();

        let err = store.insert_macrocycle(&macrocycle("u1", true)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Other users are unaffected
        store.insert_macrocycle(&macrocycle("u2", true)).unwrap();
    }

    #[test]
    fn test_activate_switches_active_plan() {
        let store = MemoryStore::new();
        let first = macrocycle("u1", true);
        let second = macrocycle("u1", false);
        store.insert_macrocycle(&first).unwrap();
        store.insert_macrocycle(&second).unwrap();

        store.activate_macrocycle("u1", second.id).unwrap();

        let active = store.active_macrocycle("u1").unwrap().unwrap();
        assert_eq!(active.id, second.id);
        let state = store.read().unwrap();
        assert_eq!(state.macrocycles.iter().filter(|m| m.is_active).count(), 1);
    }

    #[test]
    fn test_activate_unknown_plan_is_not_found() {
        let store = MemoryStore::new();
        let err = store.activate_macrocycle("u1", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_logs_between_filters_user_and_range() {
        let store = MemoryStore::new();
        for (user, day) in [("u1", 1), ("u1", 5), ("u2", 3), ("u1", 10)] {
            store
                .append_log(&WorkoutLog {
                    id: Uuid::new_v4(),
                    user_id: user.into(),
                    date: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
                    duration_minutes: 45,
                    completed_sets: vec![],
                })
                .unwrap();
        }

        let logs = store
            .logs_between(
                "u1",
                Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap(),
            )
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs[0].date < logs[1].date);
    }

    #[test]
    fn test_last_deload_is_latest_date() {
        let store = MemoryStore::new();
        for day in [3, 20, 9] {
            store
                .record_deload(&DeloadRecord {
                    user_id: "u1".into(),
                    date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
                })
                .unwrap();
        }
        assert_eq!(
            store.last_deload("u1").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 20)
        );
        assert_eq!(store.last_deload("u2").unwrap(), None);
    }
}
