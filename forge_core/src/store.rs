//! Repository ports consumed by the engine.
//!
//! Components never talk to a storage client directly; they are handed one
//! of these traits at construction time. [`crate::memory::MemoryStore`] and
//! [`crate::state::FileStore`] implement all of them.

use crate::{
    CompletedSet, DeloadRecord, Macrocycle, MuscleGroup, Result, Routine, UserFatigueState,
    VolumeLandmark, WorkoutLog,
};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Per-user fatigue records
pub trait FatigueRepository: Send + Sync {
    fn load_fatigue(&self, user_id: &str) -> Result<Option<UserFatigueState>>;
    fn save_fatigue(&self, state: &UserFatigueState) -> Result<()>;

    /// Read-modify-write of one user's state, starting from `initial` when
    /// none is stored.
    ///
    /// Stores shared between processes override this to hold their own
    /// lock across the read and the write.
    fn update_fatigue<F>(
        &self,
        user_id: &str,
        initial: UserFatigueState,
        f: F,
    ) -> Result<UserFatigueState>
    where
        F: FnOnce(&mut UserFatigueState),
        Self: Sized,
    {
        let mut state = self.load_fatigue(user_id)?.unwrap_or(initial);
        f(&mut state);
        self.save_fatigue(&state)?;
        Ok(state)
    }
}

/// Per-user, per-muscle-group volume landmarks
pub trait LandmarkRepository: Send + Sync {
    fn load_landmark(&self, user_id: &str, group: MuscleGroup) -> Result<Option<VolumeLandmark>>;

    /// All landmarks of a user, ordered by muscle group
    fn load_landmarks(&self, user_id: &str) -> Result<Vec<VolumeLandmark>>;

    fn save_landmark(&self, landmark: &VolumeLandmark) -> Result<()>;

    fn save_landmarks(&self, landmarks: &[VolumeLandmark]) -> Result<()> {
        for landmark in landmarks {
            self.save_landmark(landmark)?;
        }
        Ok(())
    }

    /// Store freshly computed volumes without touching the thresholds.
    ///
    /// Groups the user has no landmark for yet are stored as given. Must be
    /// one atomic step so a concurrent threshold edit is never reverted.
    fn record_volumes(&self, landmarks: &[VolumeLandmark]) -> Result<()>;

    /// Store template thresholds, keeping any stored `current_volume`.
    ///
    /// Atomic in the same way as [`LandmarkRepository::record_volumes`].
    fn seed_landmarks(&self, landmarks: &[VolumeLandmark]) -> Result<()>;
}

/// Macrocycles, their routines and the deload history
pub trait PlanRepository: Send + Sync {
    /// Store a new macrocycle.
    ///
    /// Fails with `Conflict` when the macrocycle is marked active while the
    /// user already has an active one.
    fn insert_macrocycle(&self, macrocycle: &Macrocycle) -> Result<()>;

    fn delete_macrocycle(&self, user_id: &str, macrocycle_id: Uuid) -> Result<()>;

    fn insert_routines(&self, routines: &[Routine]) -> Result<()>;

    /// Make `macrocycle_id` the only active macrocycle of the user.
    ///
    /// Deactivating the previous plan and activating the new one happen in
    /// one step; implementations must never expose two active plans.
    fn activate_macrocycle(&self, user_id: &str, macrocycle_id: Uuid) -> Result<()>;

    fn active_macrocycle(&self, user_id: &str) -> Result<Option<Macrocycle>>;

    fn routines_for(&self, macrocycle_id: Uuid) -> Result<Vec<Routine>>;

    fn record_deload(&self, record: &DeloadRecord) -> Result<()>;

    fn last_deload(&self, user_id: &str) -> Result<Option<NaiveDate>>;
}

/// The workout-log collaborator (exercise history store)
pub trait WorkoutLogRepository: Send + Sync {
    fn append_log(&self, log: &WorkoutLog) -> Result<()>;

    /// Logs of a user with `from <= date <= to`, oldest first
    fn logs_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkoutLog>>;

    /// Most recent set of an exercise, by set timestamp
    fn latest_set(&self, user_id: &str, exercise_id: &str) -> Result<Option<CompletedSet>> {
        let logs = self.logs_between(user_id, DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)?;
        Ok(logs
            .into_iter()
            .flat_map(|log| log.completed_sets)
            .filter(|set| set.exercise_id == exercise_id)
            .max_by_key(|set| set.timestamp))
    }
}

/// Everything the engine facade needs from one backing store
pub trait Store: FatigueRepository + LandmarkRepository + PlanRepository + WorkoutLogRepository {}

impl<T> Store for T where
    T: FatigueRepository + LandmarkRepository + PlanRepository + WorkoutLogRepository
{
}
