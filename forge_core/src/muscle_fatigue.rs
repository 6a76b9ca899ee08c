//! Recency-weighted fatigue per muscle group.
//!
//! Each completed set adds `1 / (1 + days_ago)` to every muscle group its
//! exercise loads. The result is a view over the logs and is never stored.

use crate::catalog::ExerciseCatalog;
use crate::{MuscleGroup, MuscleGroupFatigueMap, WorkoutLog};
use chrono::{DateTime, Utc};

pub struct MuscleGroupFatigueAnalyzer<'a, C: ?Sized> {
    catalog: &'a C,
}

impl<'a, C: ExerciseCatalog + ?Sized> MuscleGroupFatigueAnalyzer<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Score every muscle group of the taxonomy for `user_id` as of `now`.
    ///
    /// Logs of other users are ignored; untouched groups score 0 and sets
    /// of unknown exercises contribute nothing.
    pub fn analyze(
        &self,
        user_id: &str,
        logs: &[WorkoutLog],
        now: DateTime<Utc>,
    ) -> MuscleGroupFatigueMap {
        let mut scores: MuscleGroupFatigueMap =
            MuscleGroup::ALL.iter().map(|g| (*g, 0.0)).collect();

        for log in logs.iter().filter(|l| l.user_id == user_id) {
            for set in &log.completed_sets {
                let groups = self.catalog.muscle_groups(&set.exercise_id);
                if groups.is_empty() {
                    tracing::debug!("Unknown exercise '{}' ignored", set.exercise_id);
                    continue;
                }

                let contribution = recency_weight(set.timestamp, now);
                for group in groups {
                    *scores.entry(group).or_insert(0.0) += contribution;
                }
            }
        }

        scores
    }
}

/// `1 / (1 + whole days between then and now)`; future timestamps count as today
pub fn recency_weight(then: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days_ago = (now - then).num_days().max(0);
    1.0 / (1.0 + days_ago as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::get_default_catalog;
    use crate::CompletedSet;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 18, 0, 0).unwrap()
    }

    fn log(user_id: &str, days_ago: i64, exercises: &[&str]) -> WorkoutLog {
        let date = now() - Duration::days(days_ago);
        WorkoutLog {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            date,
            duration_minutes: 60,
            completed_sets: exercises
                .iter()
                .map(|e| CompletedSet {
                    exercise_id: (*e).into(),
                    reps: 8,
                    weight: 50.0,
                    rir: Some(2),
                    timestamp: date,
                })
                .collect(),
        }
    }

    #[test]
    fn test_every_group_present() {
        let analyzer = MuscleGroupFatigueAnalyzer::new(get_default_catalog());
        let scores = analyzer.analyze("u1", &[], now());
        assert_eq!(scores.len(), MuscleGroup::ALL.len());
        assert!(scores.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_bench_press_loads_three_groups() {
        let analyzer = MuscleGroupFatigueAnalyzer::new(get_default_catalog());
        let scores = analyzer.analyze("u1", &[log("u1", 0, &["bench_press", "bench_press"])], now());

        assert_eq!(scores[&MuscleGroup::Chest], 2.0);
        assert_eq!(scores[&MuscleGroup::Shoulders], 2.0);
        assert_eq!(scores[&MuscleGroup::Arms], 2.0);
        assert_eq!(scores[&MuscleGroup::Legs], 0.0);
    }

    #[test]
    fn test_recent_sessions_weigh_more() {
        let analyzer = MuscleGroupFatigueAnalyzer::new(get_default_catalog());
        let logs = vec![log("u1", 1, &["squat"]), log("u1", 6, &["pull_up"])];
        let scores = analyzer.analyze("u1", &logs, now());

        assert_eq!(scores[&MuscleGroup::Legs], 0.5);
        assert!((scores[&MuscleGroup::Back] - 1.0 / 7.0).abs() < 1e-9);
        assert!(scores[&MuscleGroup::Legs] > scores[&MuscleGroup::Back]);
    }

    #[test]
    fn test_more_frequent_and_recent_scores_at_least_as_high() {
        let analyzer = MuscleGroupFatigueAnalyzer::new(get_default_catalog());
        let logs = vec![
            log("u1", 1, &["cable_fly"]),
            log("u1", 3, &["cable_fly"]),
            log("u1", 3, &["plank"]),
        ];
        let scores = analyzer.analyze("u1", &logs, now());
        assert!(scores[&MuscleGroup::Chest] >= scores[&MuscleGroup::Core]);
    }

    #[test]
    fn test_unknown_exercise_and_other_users_ignored() {
        let analyzer = MuscleGroupFatigueAnalyzer::new(get_default_catalog());
        let logs = vec![
            log("u1", 0, &["mystery_machine"]),
            log("u2", 0, &["squat"]),
        ];
        let scores = analyzer.analyze("u1", &logs, now());
        assert!(scores.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_future_timestamps_count_as_today() {
        assert_eq!(recency_weight(now() + Duration::days(2), now()), 1.0);
    }
}
