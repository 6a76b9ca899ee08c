//! Working-weight recommendation.
//!
//! Estimates a 1RM from the last logged set, back-calculates the weight for
//! the requested reps and RIR with the same formula, discounts it for
//! fatigue above baseline and rounds to the nearest plate increment.

use crate::config::LoadConfig;
use crate::context::TrainingLoadContext;
use crate::store::WorkoutLogRepository;
use crate::{Error, Result};
use std::sync::Arc;

pub struct LoadRecommender<R> {
    history: Arc<R>,
    params: LoadConfig,
}

impl<R: WorkoutLogRepository> LoadRecommender<R> {
    pub fn new(history: Arc<R>, params: LoadConfig) -> Self {
        Self { history, params }
    }

    /// Next working weight for `exercise_id`, or `None` without history.
    ///
    /// `target_reps == 0` is a validation error, distinct from "no data".
    pub fn recommend(
        &self,
        ctx: &TrainingLoadContext,
        exercise_id: &str,
        target_reps: u32,
        target_rir: u32,
    ) -> Result<Option<f64>> {
        if target_reps == 0 {
            return Err(Error::validation("Target reps must be positive"));
        }

        let Some(last) = self.history.latest_set(&ctx.user_id, exercise_id)? else {
            tracing::debug!(
                "No history for {} / {}, cannot recommend a load",
                ctx.user_id,
                exercise_id
            );
            return Ok(None);
        };

        let e1rm = estimate_one_rep_max(
            last.weight,
            last.reps,
            last.rir.unwrap_or(0),
            self.params.rep_divisor,
        );
        let discount = fatigue_discount(ctx.fatigue_excess(), &self.params);
        let raw = weight_for(e1rm, target_reps, target_rir, self.params.rep_divisor) * discount;
        let weight = round_to_increment(raw, self.params.plate_increment);

        tracing::info!(
            "Load for {} x{} @{} RIR: e1RM {:.1}, discount {:.3}, {:.2} -> {}",
            exercise_id,
            target_reps,
            target_rir,
            e1rm,
            discount,
            raw,
            weight
        );
        Ok(Some(weight))
    }
}

/// `weight * (1 + (reps + rir) / divisor)`
pub fn estimate_one_rep_max(weight: f64, reps: u32, rir: u32, divisor: f64) -> f64 {
    weight * (1.0 + (f64::from(reps) + f64::from(rir)) / divisor)
}

/// Inverse of [`estimate_one_rep_max`]
pub fn weight_for(one_rep_max: f64, reps: u32, rir: u32, divisor: f64) -> f64 {
    one_rep_max / (1.0 + (f64::from(reps) + f64::from(rir)) / divisor)
}

/// `1 - excess / fatigue_divisor`, clamped to `[discount_floor, 1]`
pub fn fatigue_discount(fatigue_excess: f64, params: &LoadConfig) -> f64 {
    (1.0 - fatigue_excess.max(0.0) / params.fatigue_divisor).clamp(params.discount_floor, 1.0)
}

/// Round half up to a multiple of `increment`; never negative
pub fn round_to_increment(value: f64, increment: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    (value / increment + 0.5).floor() * increment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::{CompletedSet, UserFatigueState, WorkoutLog};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn context(current: f64) -> TrainingLoadContext {
        let now = Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap();
        TrainingLoadContext {
            user_id: "u1".into(),
            as_of: now,
            fatigue: UserFatigueState {
                user_id: "u1".into(),
                current_fatigue: current,
                baseline_fatigue: 20.0,
                recovery_rate: 5.0,
                last_updated: now,
            },
            volume: vec![],
            weeks_since_deload: None,
            has_history: true,
        }
    }

    fn store_with_set(exercise_id: &str, weight: f64, reps: u32, rir: Option<u32>) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let date = Utc.with_ymd_and_hms(2024, 4, 1, 18, 0, 0).unwrap();
        store
            .append_log(&WorkoutLog {
                id: Uuid::new_v4(),
                user_id: "u1".into(),
                date,
                duration_minutes: 60,
                completed_sets: vec![CompletedSet {
                    exercise_id: exercise_id.into(),
                    reps,
                    weight,
                    rir,
                    timestamp: date,
                }],
            })
            .unwrap();
        store
    }

    fn is_multiple_of(value: f64, increment: f64) -> bool {
        let steps = value / increment;
        (steps - steps.round()).abs() < 1e-9
    }

    #[test]
    fn test_bench_press_scenario() {
        let store = store_with_set("bench_press", 80.0, 8, Some(2));
        let recommender = LoadRecommender::new(store, LoadConfig::default());

        let weight = recommender
            .recommend(&context(40.0), "bench_press", 6, 1)
            .unwrap()
            .unwrap();

        assert!(weight > 80.0 && weight < 90.0, "got {}", weight);
        assert!(is_multiple_of(weight, 2.5));
    }

    #[test]
    fn test_no_history_returns_none() {
        let store = store_with_set("bench_press", 80.0, 8, Some(2));
        let recommender = LoadRecommender::new(store, LoadConfig::default());

        let result = recommender.recommend(&context(30.0), "squat", 5, 2).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_zero_reps_is_a_validation_error() {
        let store = store_with_set("bench_press", 80.0, 8, Some(2));
        let recommender = LoadRecommender::new(store, LoadConfig::default());

        let err = recommender
            .recommend(&context(30.0), "bench_press", 0, 2)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_uses_most_recent_set() {
        let store = store_with_set("squat", 100.0, 5, Some(2));
        let later = Utc.with_ymd_and_hms(2024, 4, 1, 18, 0, 0).unwrap() + Duration::days(1);
        store
            .append_log(&WorkoutLog {
                id: Uuid::new_v4(),
                user_id: "u1".into(),
                date: later,
                duration_minutes: 45,
                completed_sets: vec![CompletedSet {
                    exercise_id: "squat".into(),
                    reps: 5,
                    weight: 120.0,
                    rir: Some(2),
                    timestamp: later,
                }],
            })
            .unwrap();
        let recommender = LoadRecommender::new(store, LoadConfig::default());

        // Same reps/RIR at baseline fatigue reproduces the last working weight
        let weight = recommender
            .recommend(&context(20.0), "squat", 5, 2)
            .unwrap()
            .unwrap();
        assert_eq!(weight, 120.0);
    }

    #[test]
    fn test_more_fatigue_never_increases_load() {
        let store = store_with_set("overhead_press", 50.0, 6, Some(1));
        let recommender = LoadRecommender::new(store, LoadConfig::default());

        let mut previous = f64::MAX;
        for fatigue in [20.0, 35.0, 50.0, 70.0, 100.0] {
            let weight = recommender
                .recommend(&context(fatigue), "overhead_press", 8, 2)
                .unwrap()
                .unwrap();
            assert!(weight <= previous);
            previous = weight;
        }
    }

    #[test]
    fn test_output_is_non_negative_multiple_of_increment() {
        for weight in [0.0, 2.5, 17.3, 61.0, 142.5] {
            for reps in [1, 5, 12, 30] {
                let store = store_with_set("deadlift", weight, reps, Some(1));
                let recommender = LoadRecommender::new(store, LoadConfig::default());
                for target_reps in [1, 3, 8, 20] {
                    for target_rir in [0, 2, 5] {
                        for fatigue in [20.0, 60.0, 100.0] {
                            let out = recommender
                                .recommend(&context(fatigue), "deadlift", target_reps, target_rir)
                                .unwrap()
                                .unwrap();
                            assert!(out >= 0.0);
                            assert!(is_multiple_of(out, 2.5), "{} not a plate multiple", out);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_extreme_reps_and_rir_do_not_overflow() {
        let store = store_with_set("squat", 100.0, u32::MAX, Some(5));
        let recommender = LoadRecommender::new(store, LoadConfig::default());

        let weight = recommender
            .recommend(&context(20.0), "squat", u32::MAX, u32::MAX)
            .unwrap()
            .unwrap();
        assert!(weight.is_finite() && weight >= 0.0);
        assert!(is_multiple_of(weight, 2.5));
    }

    #[test]
    fn test_discount_is_clamped() {
        let params = LoadConfig::default();
        assert_eq!(fatigue_discount(0.0, &params), 1.0);
        assert_eq!(fatigue_discount(-10.0, &params), 1.0);
        assert_eq!(fatigue_discount(80.0, &params), 0.85);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_to_increment(81.25, 2.5), 82.5);
        assert_eq!(round_to_increment(81.24, 2.5), 80.0);
        assert_eq!(round_to_increment(-3.0, 2.5), 0.0);
    }
}
