//! Deload recommendation.
//!
//! Auto-regulated schedules react to fatigue and volume; fixed schedules
//! only count weeks since the last deload. Every recommendation carries
//! reason codes so a front end can explain it without recomputing anything.

use crate::config::DeloadConfig;
use crate::context::TrainingLoadContext;
use crate::{DeloadRecommendation, DeloadTiming, DeloadType, Goal, ReasonCode, TrainingLevel};
use serde::{Deserialize, Serialize};

/// How a user wants deloads scheduled
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DeloadSchedule {
    /// Weeks between deloads; 0 means "use the level default"
    pub frequency_weeks: u32,
    pub strategy: DeloadType,
    pub timing: DeloadTiming,
    pub auto_regulated: bool,
    pub fatigue_threshold: f64,
}

impl DeloadSchedule {
    /// Fixed schedule with the usual interval for a training level
    pub fn for_level(level: TrainingLevel) -> Self {
        let frequency_weeks = match level {
            TrainingLevel::Beginner => 8,
            TrainingLevel::Intermediate => 6,
            TrainingLevel::Advanced => 4,
        };
        Self {
            frequency_weeks,
            strategy: DeloadType::Volume,
            timing: DeloadTiming::NextWeek,
            auto_regulated: false,
            fatigue_threshold: 70.0,
        }
    }
}

pub struct DeloadAdvisor {
    params: DeloadConfig,
}

impl DeloadAdvisor {
    pub fn new(params: DeloadConfig) -> Self {
        Self { params }
    }

    /// Never fails; missing history shows up as reason codes instead
    pub fn analyze_and_recommend(
        &self,
        ctx: &TrainingLoadContext,
        level: TrainingLevel,
        goal: Goal,
        schedule: &DeloadSchedule,
    ) -> DeloadRecommendation {
        let mut reasons = Vec::new();
        let fatigue = ctx.fatigue.current_fatigue;

        let mut deload_type = schedule.strategy;
        let should_deload = if schedule.auto_regulated {
            let fatigue_high = fatigue > schedule.fatigue_threshold;
            let volume_high = ctx.majority_near_mrv();

            if fatigue_high {
                reasons.push(ReasonCode::FatigueAboveThreshold);
                deload_type = match goal {
                    Goal::Strength => DeloadType::Full,
                    _ => DeloadType::Intensity,
                };
            }
            if volume_high {
                reasons.push(ReasonCode::VolumeNearMrv);
                if !fatigue_high {
                    deload_type = DeloadType::Volume;
                }
            }
            fatigue_high || volume_high
        } else {
            let frequency = if schedule.frequency_weeks == 0 {
                DeloadSchedule::for_level(level).frequency_weeks
            } else {
                schedule.frequency_weeks
            };
            match ctx.weeks_since_deload {
                Some(weeks) if weeks >= frequency => {
                    reasons.push(ReasonCode::ScheduledInterval);
                    true
                }
                Some(_) => false,
                None => {
                    reasons.push(ReasonCode::NoDeloadHistory);
                    false
                }
            }
        };

        if ctx.any_exceeding_mrv() {
            reasons.push(ReasonCode::VolumeExceedsMrv);
        }
        if !ctx.has_history {
            reasons.push(ReasonCode::InsufficientData);
        }
        if !should_deload && !reasons.contains(&ReasonCode::NoDeloadHistory) {
            reasons.push(ReasonCode::WithinRecoveryCapacity);
        }

        let timing = if should_deload
            && (fatigue >= schedule.fatigue_threshold + self.params.immediate_margin
                || ctx.any_exceeding_mrv())
        {
            DeloadTiming::Immediate
        } else {
            schedule.timing
        };

        tracing::info!(
            "Deload for {} ({:?}, {:?}): {} {:?}",
            ctx.user_id,
            level,
            goal,
            should_deload,
            reasons
        );

        DeloadRecommendation {
            should_deload,
            deload_type,
            timing,
            reason_codes: reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MuscleGroup, UserFatigueState, VolumeStatus, VolumeSummary};
    use chrono::{TimeZone, Utc};

    fn row(group: MuscleGroup, status: VolumeStatus) -> VolumeSummary {
        VolumeSummary {
            muscle_group: group,
            current_volume: 0.0,
            mev: 8.0,
            mav: 16.0,
            mrv: 22.0,
            status,
            recommendation: String::new(),
        }
    }

    fn context(fatigue: f64, volume: Vec<VolumeSummary>, weeks: Option<u32>) -> TrainingLoadContext {
        let now = Utc.with_ymd_and_hms(2024, 8, 1, 7, 0, 0).unwrap();
        TrainingLoadContext {
            user_id: "u1".into(),
            as_of: now,
            fatigue: UserFatigueState {
                user_id: "u1".into(),
                current_fatigue: fatigue,
                baseline_fatigue: 20.0,
                recovery_rate: 5.0,
                last_updated: now,
            },
            volume,
            weeks_since_deload: weeks,
            has_history: true,
        }
    }

    fn auto() -> DeloadSchedule {
        DeloadSchedule {
            auto_regulated: true,
            ..DeloadSchedule::for_level(TrainingLevel::Intermediate)
        }
    }

    fn advisor() -> DeloadAdvisor {
        DeloadAdvisor::new(DeloadConfig::default())
    }

    #[test]
    fn test_high_fatigue_triggers_auto_deload() {
        let rec = advisor().analyze_and_recommend(
            &context(75.0, vec![], Some(1)),
            TrainingLevel::Intermediate,
            Goal::Hypertrophy,
            &auto(),
        );
        assert!(rec.should_deload);
        assert_eq!(rec.deload_type, DeloadType::Intensity);
        assert_eq!(rec.timing, DeloadTiming::NextWeek);
        assert!(rec.reason_codes.contains(&ReasonCode::FatigueAboveThreshold));
    }

    #[test]
    fn test_fatigue_well_above_threshold_is_immediate() {
        let rec = advisor().analyze_and_recommend(
            &context(90.0, vec![], Some(1)),
            TrainingLevel::Advanced,
            Goal::Strength,
            &auto(),
        );
        assert_eq!(rec.deload_type, DeloadType::Full);
        assert_eq!(rec.timing, DeloadTiming::Immediate);
    }

    #[test]
    fn test_volume_majority_triggers_volume_deload() {
        let volume = vec![
            row(MuscleGroup::Chest, VolumeStatus::ApproachingMrv),
            row(MuscleGroup::Back, VolumeStatus::ApproachingMrv),
            row(MuscleGroup::Legs, VolumeStatus::Optimal),
        ];
        let rec = advisor().analyze_and_recommend(
            &context(40.0, volume, Some(1)),
            TrainingLevel::Intermediate,
            Goal::Hypertrophy,
            &auto(),
        );
        assert!(rec.should_deload);
        assert_eq!(rec.deload_type, DeloadType::Volume);
        assert_eq!(rec.reason_codes, vec![ReasonCode::VolumeNearMrv]);
    }

    #[test]
    fn test_exceeding_mrv_makes_deload_immediate() {
        let volume = vec![
            row(MuscleGroup::Chest, VolumeStatus::ExceedingMrv),
            row(MuscleGroup::Back, VolumeStatus::ApproachingMrv),
        ];
        let rec = advisor().analyze_and_recommend(
            &context(40.0, volume, Some(1)),
            TrainingLevel::Intermediate,
            Goal::Endurance,
            &auto(),
        );
        assert!(rec.should_deload);
        assert_eq!(rec.timing, DeloadTiming::Immediate);
        assert!(rec.reason_codes.contains(&ReasonCode::VolumeExceedsMrv));
    }

    #[test]
    fn test_auto_within_capacity() {
        let rec = advisor().analyze_and_recommend(
            &context(45.0, vec![row(MuscleGroup::Chest, VolumeStatus::Optimal)], Some(10)),
            TrainingLevel::Intermediate,
            Goal::Hypertrophy,
            &auto(),
        );
        assert!(!rec.should_deload);
        assert_eq!(rec.reason_codes, vec![ReasonCode::WithinRecoveryCapacity]);
    }

    #[test]
    fn test_fixed_schedule_ignores_fatigue() {
        let schedule = DeloadSchedule::for_level(TrainingLevel::Intermediate);

        let early = advisor().analyze_and_recommend(
            &context(95.0, vec![], Some(3)),
            TrainingLevel::Intermediate,
            Goal::Strength,
            &schedule,
        );
        assert!(!early.should_deload);

        let due = advisor().analyze_and_recommend(
            &context(25.0, vec![], Some(6)),
            TrainingLevel::Intermediate,
            Goal::Strength,
            &schedule,
        );
        assert!(due.should_deload);
        assert_eq!(due.deload_type, DeloadType::Volume);
        assert_eq!(due.reason_codes, vec![ReasonCode::ScheduledInterval]);
    }

    #[test]
    fn test_zero_frequency_falls_back_to_level() {
        let schedule = DeloadSchedule {
            frequency_weeks: 0,
            ..DeloadSchedule::for_level(TrainingLevel::Beginner)
        };
        let rec = advisor().analyze_and_recommend(
            &context(25.0, vec![], Some(4)),
            TrainingLevel::Advanced,
            Goal::GeneralFitness,
            &schedule,
        );
        assert!(rec.should_deload);
    }

    #[test]
    fn test_new_user_gets_informational_codes() {
        let mut ctx = context(30.0, vec![], None);
        ctx.has_history = false;

        let rec = advisor().analyze_and_recommend(
            &ctx,
            TrainingLevel::Beginner,
            Goal::GeneralFitness,
            &DeloadSchedule::for_level(TrainingLevel::Beginner),
        );
        assert!(!rec.should_deload);
        assert_eq!(
            rec.reason_codes,
            vec![ReasonCode::NoDeloadHistory, ReasonCode::InsufficientData]
        );
    }

    #[test]
    fn test_reason_codes_never_empty() {
        let advisor = advisor();
        for fatigue in [20.0, 60.0, 71.0, 100.0] {
            for weeks in [None, Some(0), Some(8)] {
                for auto_regulated in [false, true] {
                    let schedule = DeloadSchedule {
                        auto_regulated,
                        ..DeloadSchedule::for_level(TrainingLevel::Intermediate)
                    };
                    let rec = advisor.analyze_and_recommend(
                        &context(fatigue, vec![], weeks),
                        TrainingLevel::Intermediate,
                        Goal::Hypertrophy,
                        &schedule,
                    );
                    assert!(!rec.reason_codes.is_empty());
                }
            }
        }
    }
}
