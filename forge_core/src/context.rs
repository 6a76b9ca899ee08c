//! Shared per-request view of a user's training load.
//!
//! Built once per request and handed to both the load recommender and the
//! deload advisor so they judge overreaching against the same numbers.

use crate::{UserFatigueState, VolumeStatus, VolumeSummary};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug)]
pub struct TrainingLoadContext {
    pub user_id: String,
    pub as_of: DateTime<Utc>,
    pub fatigue: UserFatigueState,
    /// One row per tracked muscle group
    pub volume: Vec<VolumeSummary>,
    /// `None` when neither a deload nor a plan start is on record
    pub weeks_since_deload: Option<u32>,
    /// Whether any workout has been logged for the user
    pub has_history: bool,
}

impl TrainingLoadContext {
    /// Fatigue points above baseline
    pub fn fatigue_excess(&self) -> f64 {
        self.fatigue.excess()
    }

    /// Number of tracked groups at or above `status`
    pub fn groups_at_or_above(&self, status: VolumeStatus) -> usize {
        self.volume.iter().filter(|row| row.status >= status).count()
    }

    /// Strictly more than half of the tracked groups are at/above approaching MRV
    pub fn majority_near_mrv(&self) -> bool {
        let tracked = self.volume.len();
        tracked > 0 && self.groups_at_or_above(VolumeStatus::ApproachingMrv) * 2 > tracked
    }

    pub fn any_exceeding_mrv(&self) -> bool {
        self.groups_at_or_above(VolumeStatus::ExceedingMrv) > 0
    }
}
