//! Exercise catalog: exercise → muscle group mapping.
//!
//! The engine only needs to know which muscle groups an exercise loads.
//! Hosts with their own exercise database implement [`ExerciseCatalog`];
//! everything else uses the built-in default catalog.

use crate::types::MuscleGroup;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An exercise definition (e.g., "Barbell Bench Press")
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub primary: Vec<MuscleGroup>,
    pub secondary: Vec<MuscleGroup>,
    pub compound: bool,
}

impl Exercise {
    /// Primary and secondary groups, primary first, without duplicates
    pub fn muscle_groups(&self) -> Vec<MuscleGroup> {
        let mut groups = self.primary.clone();
        for g in &self.secondary {
            if !groups.contains(g) {
                groups.push(*g);
            }
        }
        groups
    }

    pub fn targets(&self, group: MuscleGroup) -> bool {
        self.primary.contains(&group) || self.secondary.contains(&group)
    }
}

/// Lookup port for the exercise-catalog collaborator
pub trait ExerciseCatalog: Send + Sync {
    fn exercise(&self, exercise_id: &str) -> Option<&Exercise>;

    /// All exercises, sorted by id
    fn exercises(&self) -> Vec<&Exercise>;

    /// Groups loaded by an exercise; empty for unknown ids
    fn muscle_groups(&self, exercise_id: &str) -> Vec<MuscleGroup> {
        self.exercise(exercise_id)
            .map(Exercise::muscle_groups)
            .unwrap_or_default()
    }

    /// Exercises whose primary target is `group`, compound movements first
    fn primary_exercises(&self, group: MuscleGroup) -> Vec<&Exercise> {
        let mut found: Vec<_> = self
            .exercises()
            .into_iter()
            .filter(|e| e.primary.contains(&group))
            .collect();
        found.sort_by(|a, b| b.compound.cmp(&a.compound).then_with(|| a.id.cmp(&b.id)));
        found
    }
}

/// In-memory catalog keyed by exercise id
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub exercises: HashMap<String, Exercise>,
}

impl ExerciseCatalog for Catalog {
    fn exercise(&self, exercise_id: &str) -> Option<&Exercise> {
        self.exercises.get(exercise_id)
    }

    fn exercises(&self) -> Vec<&Exercise> {
        let mut all: Vec<_> = self.exercises.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

impl Catalog {
    pub fn insert(&mut self, exercise: Exercise) {
        self.exercises.insert(exercise.id.clone(), exercise);
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, exercise) in &self.exercises {
            if id.is_empty() || exercise.id.is_empty() {
                errors.push("Exercise has empty ID".to_string());
            }
            if id != &exercise.id {
                errors.push(format!(
                    "Exercise key '{}' doesn't match exercise.id '{}'",
                    id, exercise.id
                ));
            }
            if exercise.name.is_empty() {
                errors.push(format!("Exercise '{}' has empty name", id));
            }
            if exercise.primary.is_empty() {
                errors.push(format!("Exercise '{}' has no primary muscle group", id));
            }
            if exercise.secondary.iter().any(|g| exercise.primary.contains(g)) {
                errors.push(format!(
                    "Exercise '{}' lists a group as both primary and secondary",
                    id
                ));
            }
        }

        for group in MuscleGroup::ALL {
            if self.primary_exercises(group).is_empty() {
                errors.push(format!("No exercise trains {} as a primary group", group));
            }
        }

        errors
    }
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

fn exercise(
    id: &str,
    name: &str,
    primary: &[MuscleGroup],
    secondary: &[MuscleGroup],
    compound: bool,
) -> Exercise {
    Exercise {
        id: id.into(),
        name: name.into(),
        primary: primary.to_vec(),
        secondary: secondary.to_vec(),
        compound,
    }
}

/// Builds the default catalog with the built-in exercises
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference.
pub fn build_default_catalog() -> Catalog {
    use MuscleGroup::*;

    let mut catalog = Catalog::default();

    // Chest
    catalog.insert(exercise("bench_press", "Barbell Bench Press", &[Chest], &[Shoulders, Arms], true));
    catalog.insert(exercise(
        "incline_dumbbell_press",
        "Incline Dumbbell Press",
        &[Chest],
        &[Shoulders, Arms],
        true,
    ));
    catalog.insert(exercise("push_up", "Push-up", &[Chest], &[Shoulders, Arms, Core], true));
    catalog.insert(exercise("cable_fly", "Cable Fly", &[Chest], &[], false));

    // Back
    catalog.insert(exercise("pull_up", "Pull-up", &[Back], &[Arms], true));
    catalog.insert(exercise("barbell_row", "Barbell Row", &[Back], &[Arms, Shoulders], true));
    catalog.insert(exercise("lat_pulldown", "Lat Pulldown", &[Back], &[Arms], true));

    // Shoulders
    catalog.insert(exercise("overhead_press", "Overhead Press", &[Shoulders], &[Arms, Core], true));
    catalog.insert(exercise("lateral_raise", "Dumbbell Lateral Raise", &[Shoulders], &[], false));
    catalog.insert(exercise("face_pull", "Face Pull", &[Shoulders], &[Back], false));

    // Arms
    catalog.insert(exercise("barbell_curl", "Barbell Curl", &[Arms], &[], false));
    catalog.insert(exercise("triceps_pushdown", "Triceps Pushdown", &[Arms], &[], false));
    catalog.insert(exercise("dip", "Parallel Bar Dip", &[Arms], &[Chest, Shoulders], true));

    // Legs and glutes
    catalog.insert(exercise("squat", "Barbell Back Squat", &[Legs], &[Glutes, Core], true));
    catalog.insert(exercise("leg_press", "Leg Press", &[Legs], &[Glutes], true));
    catalog.insert(exercise(
        "romanian_deadlift",
        "Romanian Deadlift",
        &[Legs, Glutes],
        &[Back],
        true,
    ));
    catalog.insert(exercise("deadlift", "Conventional Deadlift", &[Glutes, Back], &[Legs, Core], true));
    catalog.insert(exercise("leg_curl", "Lying Leg Curl", &[Legs], &[], false));
    catalog.insert(exercise("hip_thrust", "Barbell Hip Thrust", &[Glutes], &[Legs], true));
    catalog.insert(exercise("walking_lunge", "Walking Lunge", &[Legs], &[Glutes], true));

    // Core
    catalog.insert(exercise("plank", "Plank", &[Core], &[], false));
    catalog.insert(exercise("hanging_leg_raise", "Hanging Leg Raise", &[Core], &[], false));

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(errors.is_empty(), "Catalog errors: {:?}", errors);
    }

    #[test]
    fn test_bench_press_maps_to_three_groups() {
        let groups = get_default_catalog().muscle_groups("bench_press");
        assert_eq!(
            groups,
            vec![MuscleGroup::Chest, MuscleGroup::Shoulders, MuscleGroup::Arms]
        );
    }

    #[test]
    fn test_unknown_exercise_has_no_groups() {
        assert!(get_default_catalog().muscle_groups("underwater_basket").is_empty());
    }

    #[test]
    fn test_primary_exercises_put_compounds_first() {
        let chest = get_default_catalog().primary_exercises(MuscleGroup::Chest);
        assert!(chest.len() >= 2);
        assert!(chest[0].compound);
        assert!(!chest.last().unwrap().compound);
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut catalog = Catalog::default();
        catalog.insert(exercise("odd", "", &[], &[], false));

        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("empty name")));
        assert!(errors.iter().any(|e| e.contains("no primary")));
        assert!(errors.iter().any(|e| e.contains("No exercise trains chest")));
    }
}
