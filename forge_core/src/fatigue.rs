//! Per-user fatigue model.
//!
//! Fatigue rises by a caller-supplied intensity after each workout (capped
//! at `max_fatigue`) and falls linearly with rest (floored at the user's
//! baseline). Updates are read-modify-write, so the tracker serializes them
//! per user; different users never wait on each other.

use crate::config::FatigueConfig;
use crate::store::FatigueRepository;
use crate::{Clock, Error, Result, UserFatigueState, WorkoutLog};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct FatigueTracker<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
    params: FatigueConfig,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<R: FatigueRepository> FatigueTracker<R> {
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>, params: FatigueConfig) -> Self {
        Self {
            repo,
            clock,
            params,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Stored state, or an unpersisted default for unknown users.
    ///
    /// A failing store is not fatal here: the default is returned and the
    /// failure logged.
    pub fn get_fatigue(&self, user_id: &str) -> UserFatigueState {
        match self.repo.load_fatigue(user_id) {
            Ok(Some(state)) => state,
            Ok(None) => self.default_state(user_id),
            Err(e) => {
                tracing::warn!(
                    "Fatigue store unavailable for {}: {}. Using defaults.",
                    user_id,
                    e
                );
                self.default_state(user_id)
            }
        }
    }

    /// Add workout-induced fatigue, capped at `max_fatigue`
    pub fn apply_workout(&self, user_id: &str, intensity_factor: f64) -> Result<UserFatigueState> {
        if !intensity_factor.is_finite() || intensity_factor < 0.0 {
            return Err(Error::validation(format!(
                "Intensity factor must be a non-negative number (got {})",
                intensity_factor
            )));
        }

        let max = self.params.max_fatigue;
        self.update(user_id, |state| {
            state.current_fatigue = (state.current_fatigue + intensity_factor).min(max);
        })
    }

    /// Remove rest-induced fatigue, floored at the user's baseline
    pub fn apply_rest(&self, user_id: &str, days_rested: f64) -> Result<UserFatigueState> {
        if !days_rested.is_finite() || days_rested < 0.0 {
            return Err(Error::validation(format!(
                "Days rested must be a non-negative number (got {})",
                days_rested
            )));
        }

        self.update(user_id, |state| {
            let recovered = state.recovery_rate * days_rested;
            state.current_fatigue = (state.current_fatigue - recovered).max(state.baseline_fatigue);
        })
    }

    /// Intensity a workout adds, from its volume and proximity to failure
    pub fn intensity_for(&self, log: &WorkoutLog) -> f64 {
        intensity_factor(log, &self.params)
    }

    fn default_state(&self, user_id: &str) -> UserFatigueState {
        UserFatigueState {
            user_id: user_id.to_string(),
            current_fatigue: self.params.initial_fatigue,
            baseline_fatigue: self.params.baseline_fatigue,
            recovery_rate: self.params.recovery_rate,
            last_updated: self.clock.now(),
        }
    }

    fn user_lock(&self, user_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .user_locks
            .lock()
            .map_err(|_| Error::Storage("fatigue lock table poisoned".into()))?;
        Ok(locks.entry(user_id.to_string()).or_default().clone())
    }

    fn update<F>(&self, user_id: &str, f: F) -> Result<UserFatigueState>
    where
        F: FnOnce(&mut UserFatigueState),
    {
        let lock = self.user_lock(user_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| Error::Storage(format!("fatigue lock for {} poisoned", user_id)))?;

        let now = self.clock.now();
        let mut before = 0.0;
        let state = self
            .repo
            .update_fatigue(user_id, self.default_state(user_id), |state| {
                before = state.current_fatigue;
                f(state);
                state.last_updated = now;
            })
            .map_err(|e| match e {
                // Writes must not build on a default that hides an unreachable store
                Error::Storage(_) => e,
                other => Error::Storage(other.to_string()),
            })?;

        tracing::info!(
            "Fatigue for {}: {:.1} -> {:.1}",
            user_id,
            before,
            state.current_fatigue
        );
        Ok(state)
    }
}

/// Derive a workout's intensity factor.
///
/// Every set contributes `per_set_points`, plus up to `rir_weight` times
/// that again the closer it was taken to failure. Sets logged without RIR
/// count as `assumed_rir`. The total is capped at `max_intensity`.
pub fn intensity_factor(log: &WorkoutLog, params: &FatigueConfig) -> f64 {
    let ceiling = f64::from(params.rir_ceiling.max(1));
    let total: f64 = log
        .completed_sets
        .iter()
        .map(|set| {
            let rir = f64::from(set.rir.unwrap_or(params.assumed_rir));
            let proximity = (ceiling - rir).max(0.0) / ceiling;
            params.per_set_points * (1.0 + params.rir_weight * proximity)
        })
        .sum();
    total.min(params.max_intensity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::{CompletedSet, FixedClock};
    use chrono::{TimeZone, Utc};
    use std::thread;
    use uuid::Uuid;

    fn tracker() -> FatigueTracker<MemoryStore> {
        tracker_with(Arc::new(MemoryStore::new()))
    }

    fn tracker_with<R: FatigueRepository>(repo: Arc<R>) -> FatigueTracker<R> {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        FatigueTracker::new(repo, Arc::new(clock), FatigueConfig::default())
    }

    struct BrokenRepo;

    impl FatigueRepository for BrokenRepo {
        fn load_fatigue(&self, _user_id: &str) -> Result<Option<UserFatigueState>> {
            Err(Error::Storage("connection refused".into()))
        }

        fn save_fatigue(&self, _state: &UserFatigueState) -> Result<()> {
            Err(Error::Storage("connection refused".into()))
        }
    }

    #[test]
    fn test_new_user_gets_defaults() {
        let tracker = tracker();
        let state = tracker.get_fatigue("u1");
        assert_eq!(state.current_fatigue, 30.0);
        assert_eq!(state.baseline_fatigue, 20.0);
        assert_eq!(state.recovery_rate, 5.0);
    }

    #[test]
    fn test_default_is_not_persisted_on_read() {
        let store = Arc::new(MemoryStore::new());
        let tracker = tracker_with(store.clone());
        tracker.get_fatigue("u1");
        assert!(store.load_fatigue("u1").unwrap().is_none());
    }

    #[test]
    fn test_get_is_idempotent() {
        let tracker = tracker();
        tracker.apply_workout("u1", 12.0).unwrap();
        assert_eq!(tracker.get_fatigue("u1"), tracker.get_fatigue("u1"));
        assert_eq!(tracker.get_fatigue("u2"), tracker.get_fatigue("u2"));
    }

    #[test]
    fn test_workout_caps_at_max() {
        let tracker = tracker();
        let state = tracker.apply_workout("u1", 25.0).unwrap();
        assert_eq!(state.current_fatigue, 55.0);

        let state = tracker.apply_workout("u1", 500.0).unwrap();
        assert_eq!(state.current_fatigue, 100.0);
    }

    #[test]
    fn test_rest_floors_at_baseline() {
        let tracker = tracker();
        tracker.apply_workout("u1", 30.0).unwrap(); // 60
        let state = tracker.apply_rest("u1", 2.0).unwrap();
        assert_eq!(state.current_fatigue, 50.0);

        let state = tracker.apply_rest("u1", 365.0).unwrap();
        assert_eq!(state.current_fatigue, 20.0);
    }

    #[test]
    fn test_rest_replays_compound() {
        let tracker = tracker();
        tracker.apply_workout("u1", 30.0).unwrap(); // 60
        tracker.apply_rest("u1", 1.0).unwrap();
        let state = tracker.apply_rest("u1", 1.0).unwrap();
        assert_eq!(state.current_fatigue, 50.0);
    }

    #[test]
    fn test_negative_inputs_rejected() {
        let tracker = tracker();
        assert!(matches!(
            tracker.apply_workout("u1", -1.0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            tracker.apply_rest("u1", -2.0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            tracker.apply_workout("u1", f64::NAN),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_broken_store_degrades_reads_but_fails_writes() {
        let tracker = tracker_with(Arc::new(BrokenRepo));

        let state = tracker.get_fatigue("u1");
        assert_eq!(state.current_fatigue, 30.0);

        let err = tracker.apply_workout("u1", 5.0).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_concurrent_workouts_do_not_lose_updates() {
        crate::logging::init_test();
        let tracker = Arc::new(tracker());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    let user = if i % 2 == 0 { "even" } else { "odd" };
                    for _ in 0..5 {
                        tracker.apply_workout(user, 1.0).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 4 threads x 5 workouts x 1.0 on top of the initial 30
        assert_eq!(tracker.get_fatigue("even").current_fatigue, 50.0);
        assert_eq!(tracker.get_fatigue("odd").current_fatigue, 50.0);
    }

    #[test]
    fn test_intensity_factor_rewards_proximity_to_failure() {
        let params = FatigueConfig::default();
        let log_with = |rir: Option<u32>| WorkoutLog {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            date: Utc::now(),
            duration_minutes: 60,
            completed_sets: (0..4)
                .map(|_| CompletedSet {
                    exercise_id: "squat".into(),
                    reps: 5,
                    weight: 100.0,
                    rir,
                    timestamp: Utc::now(),
                })
                .collect(),
        };

        let easy = intensity_factor(&log_with(Some(4)), &params);
        let hard = intensity_factor(&log_with(Some(0)), &params);
        let unknown = intensity_factor(&log_with(None), &params);

        assert_eq!(easy, 4.0);
        assert_eq!(hard, 8.0);
        assert_eq!(unknown, 6.0);
    }

    #[test]
    fn test_intensity_factor_is_capped() {
        let params = FatigueConfig {
            max_intensity: 3.0,
            ..FatigueConfig::default()
        };
        let log = WorkoutLog {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            date: Utc::now(),
            duration_minutes: 60,
            completed_sets: (0..10)
                .map(|_| CompletedSet {
                    exercise_id: "bench_press".into(),
                    reps: 8,
                    weight: 60.0,
                    rir: Some(1),
                    timestamp: Utc::now(),
                })
                .collect(),
        };
        assert_eq!(intensity_factor(&log, &params), 3.0);
    }
}
