//! File-backed store with file locking.
//!
//! Layout under the data directory:
//! - `state.json`: fatigue states, landmarks, plans, routines, deloads
//! - `state.lock`: sidecar lock file guarding `state.json`
//! - `workouts.jsonl`: append-only workout log
//!
//! Every write is a load-modify-save under an exclusive lock, persisted
//! through a temp file and an atomic rename, so a crash mid-write leaves the
//! previous state intact and plan activation is never half-applied.
//! Reads of a corrupt `state.json` fall back to defaults; writes refuse to
//! replace it.

use crate::memory::EngineState;
use crate::store::{FatigueRepository, LandmarkRepository, PlanRepository, WorkoutLogRepository};
use crate::workout_log::JsonlWorkoutLog;
use crate::{
    DeloadRecord, Error, Macrocycle, MuscleGroup, Result, Routine, UserFatigueState,
    VolumeLandmark, WorkoutLog,
};
use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Store persisting to a data directory
#[derive(Clone, Debug)]
pub struct FileStore {
    state_path: PathBuf,
    lock_path: PathBuf,
    log: JsonlWorkoutLog,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            state_path: data_dir.join("state.json"),
            lock_path: data_dir.join("state.lock"),
            log: JsonlWorkoutLog::new(data_dir.join("workouts.jsonl")),
        })
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn workout_log_path(&self) -> &Path {
        self.log.path()
    }

    fn lock_file(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.lock_path)?;
        Ok(file)
    }

    /// Read the current state under a shared lock
    ///
    /// Returns default state if file doesn't exist.
    /// If file is corrupted, logs a warning and returns default state.
    pub fn load(&self) -> Result<EngineState> {
        let lock = self.lock_file()?;
        lock.lock_shared()?;
        let state = self.read_unlocked().unwrap_or_else(|e| {
            tracing::warn!("{}. Using defaults.", e);
            EngineState::default()
        });
        lock.unlock()?;
        Ok(state)
    }

    /// Parse the state file; a missing or empty file is the default state
    fn read_unlocked(&self) -> Result<EngineState> {
        if !self.state_path.exists() {
            tracing::debug!("No state file found, using default state");
            return Ok(EngineState::default());
        }

        let mut contents = String::new();
        File::open(&self.state_path)
            .and_then(|f| std::io::BufReader::new(f).read_to_string(&mut contents))
            .map_err(|e| {
                Error::Storage(format!(
                    "Failed to read state file {:?}: {}",
                    self.state_path, e
                ))
            })?;
        if contents.trim().is_empty() {
            return Ok(EngineState::default());
        }

        serde_json::from_str::<EngineState>(&contents).map_err(|e| {
            Error::Storage(format!(
                "Failed to parse state file {:?}: {}",
                self.state_path, e
            ))
        })
    }

    fn write_unlocked(&self, state: &EngineState) -> Result<()> {
        let parent = self.state_path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "state path missing parent")
        })?;
        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(state)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.state_path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Load state, modify it, and save it back under one exclusive lock
    ///
    /// Nothing is written when `f` fails. An unreadable state file fails the
    /// write with `Storage` and is left untouched for repair.
    pub fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut EngineState) -> Result<T>,
    {
        let lock = self.lock_file().map_err(into_storage)?;
        lock.lock_exclusive().map_err(|e| into_storage(e.into()))?;

        let result = self.read_unlocked().and_then(|mut state| {
            let value = f(&mut state)?;
            self.write_unlocked(&state).map_err(into_storage)?;
            Ok(value)
        });

        lock.unlock()?;
        if result.is_ok() {
            tracing::debug!("Saved state to {:?}", self.state_path);
        }
        result
    }

    fn query<T>(&self, f: impl FnOnce(&EngineState) -> T) -> Result<T> {
        let state = self.load().map_err(into_storage)?;
        Ok(f(&state))
    }
}

/// Report I/O and encoding failures of the backing files as storage errors
fn into_storage(err: Error) -> Error {
    match err {
        Error::Io(e) => Error::Storage(e.to_string()),
        Error::Json(e) => Error::Storage(e.to_string()),
        other => other,
    }
}

impl FatigueRepository for FileStore {
    fn load_fatigue(&self, user_id: &str) -> Result<Option<UserFatigueState>> {
        self.query(|s| s.fatigue.get(user_id).cloned())
    }

    fn save_fatigue(&self, state: &UserFatigueState) -> Result<()> {
        self.transact(|s| {
            s.fatigue.insert(state.user_id.clone(), state.clone());
            Ok(())
        })
    }

    fn update_fatigue<F>(
        &self,
        user_id: &str,
        initial: UserFatigueState,
        f: F,
    ) -> Result<UserFatigueState>
    where
        F: FnOnce(&mut UserFatigueState),
    {
        self.transact(|s| {
            let state = s.fatigue.entry(user_id.to_string()).or_insert(initial);
            f(state);
            Ok(state.clone())
        })
    }
}

impl LandmarkRepository for FileStore {
    fn load_landmark(&self, user_id: &str, group: MuscleGroup) -> Result<Option<VolumeLandmark>> {
        self.query(|s| {
            s.landmarks
                .get(user_id)
                .and_then(|by_group| by_group.get(&group))
                .cloned()
        })
    }

    fn load_landmarks(&self, user_id: &str) -> Result<Vec<VolumeLandmark>> {
        self.query(|s| s.landmarks_of(user_id))
    }

    fn save_landmark(&self, landmark: &VolumeLandmark) -> Result<()> {
        self.transact(|s| {
            s.put_landmark(landmark);
            Ok(())
        })
    }

    fn save_landmarks(&self, landmarks: &[VolumeLandmark]) -> Result<()> {
        self.transact(|s| {
            for landmark in landmarks {
                s.put_landmark(landmark);
            }
            Ok(())
        })
    }

    fn record_volumes(&self, landmarks: &[VolumeLandmark]) -> Result<()> {
        self.transact(|s| {
            s.record_volumes(landmarks);
            Ok(())
        })
    }

    fn seed_landmarks(&self, landmarks: &[VolumeLandmark]) -> Result<()> {
        self.transact(|s| {
            s.seed_landmarks(landmarks);
            Ok(())
        })
    }
}

impl PlanRepository for FileStore {
    fn insert_macrocycle(&self, macrocycle: &Macrocycle) -> Result<()> {
        self.transact(|s| s.insert_macrocycle(macrocycle))
    }

    fn delete_macrocycle(&self, user_id: &str, macrocycle_id: Uuid) -> Result<()> {
        self.transact(|s| {
            s.delete_macrocycle(user_id, macrocycle_id);
            Ok(())
        })
    }

    fn insert_routines(&self, routines: &[Routine]) -> Result<()> {
        self.transact(|s| {
            s.routines.extend(routines.iter().cloned());
            Ok(())
        })
    }

    fn activate_macrocycle(&self, user_id: &str, macrocycle_id: Uuid) -> Result<()> {
        self.transact(|s| s.activate_macrocycle(user_id, macrocycle_id))
    }

    fn active_macrocycle(&self, user_id: &str) -> Result<Option<Macrocycle>> {
        self.query(|s| s.active_macrocycle(user_id))
    }

    fn routines_for(&self, macrocycle_id: Uuid) -> Result<Vec<Routine>> {
        self.query(|s| s.routines_for(macrocycle_id))
    }

    fn record_deload(&self, record: &DeloadRecord) -> Result<()> {
        self.transact(|s| {
            s.deloads.push(record.clone());
            Ok(())
        })
    }

    fn last_deload(&self, user_id: &str) -> Result<Option<NaiveDate>> {
        self.query(|s| s.last_deload(user_id))
    }
}

impl WorkoutLogRepository for FileStore {
    fn append_log(&self, log: &WorkoutLog) -> Result<()> {
        self.log.append(log).map_err(into_storage)
    }

    fn logs_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkoutLog>> {
        self.log.read_between(user_id, from, to).map_err(into_storage)
    }
}
