//! The local state store: single source of truth for every domain collection
//! inside a running client. Mutations persist a full snapshot to on-device
//! storage and broadcast which collection changed; the sync layer subscribes
//! to that feed.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::catalog;
use crate::db::SnapshotDb;
use crate::models::{
    DiaryEntry, FoodItem, MacroTargets, NewDiaryEntry, NewFoodItem, NewProfile, NewRecipe,
    NewWorkoutSession, Recipe, UserProfile, WeightEntry, WorkoutSession, new_id,
};
use crate::targets;

/// Which part of the state a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Profile,
    Targets,
    Weights,
    Foods,
    Pantry,
    Diary,
    Workouts,
    Cookbook,
    SelectedSplit,
}

impl Collection {
    /// Pantry, cookbook, and the split selection are local-only; the other
    /// six collections are mirrored to the remote store.
    #[must_use]
    pub fn is_synced(self) -> bool {
        matches!(
            self,
            Self::Profile
                | Self::Targets
                | Self::Weights
                | Self::Foods
                | Self::Diary
                | Self::Workouts
        )
    }
}

/// The full persisted client state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<MacroTargets>,
    #[serde(default)]
    pub weights: Vec<WeightEntry>,
    #[serde(default)]
    pub diary: Vec<DiaryEntry>,
    #[serde(default)]
    pub foods: Vec<FoodItem>,
    #[serde(default)]
    pub pantry: Vec<FoodItem>,
    #[serde(default)]
    pub workouts: Vec<WorkoutSession>,
    #[serde(default)]
    pub cookbook: Vec<Recipe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_split: Option<String>,
}

impl AppState {
    /// First-run state: everything empty except the seeded foods library.
    #[must_use]
    pub fn seeded() -> Self {
        AppState {
            foods: catalog::default_food_library()
                .into_iter()
                .map(|f| f.with_id(new_id()))
                .collect(),
            ..AppState::default()
        }
    }
}

struct Inner {
    state: AppState,
    db: Option<SnapshotDb>,
}

/// Cloneable handle to the state store. Constructed explicitly and passed to
/// whichever layer needs it; there is no ambient global.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<Collection>,
}

impl Store {
    /// Open the store backed by on-device storage, loading the persisted
    /// snapshot or seeding defaults on first run.
    pub fn open(path: &Path) -> Result<Self> {
        let db = SnapshotDb::open(path)?;
        let state = db.load()?.unwrap_or_else(AppState::seeded);
        Ok(Self::from_parts(state, Some(db)))
    }

    /// Ephemeral store with no durability, seeded like a first run.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_parts(AppState::seeded(), None)
    }

    fn from_parts(state: AppState, db: Option<SnapshotDb>) -> Self {
        let (events, _) = broadcast::channel(256);
        Store {
            inner: Arc::new(Mutex::new(Inner { state, db })),
            events,
        }
    }

    /// Change feed: one event per mutated collection.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Collection> {
        self.events.subscribe()
    }

    fn mutate<T>(&self, touched: &[Collection], f: impl FnOnce(&mut AppState) -> T) -> T {
        let out = {
            let mut inner = self
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let out = f(&mut inner.state);
            if let Some(db) = &inner.db {
                // Durability is best-effort: a failed write leaves the
                // in-memory state authoritative until the next mutation.
                if let Err(e) = db.save(&inner.state) {
                    log::error!("Failed to persist state snapshot: {e:#}");
                }
            }
            out
        };
        for c in touched {
            let _ = self.events.send(*c);
        }
        out
    }

    fn read<T>(&self, f: impl FnOnce(&AppState) -> T) -> T {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&inner.state)
    }

    #[must_use]
    pub fn snapshot(&self) -> AppState {
        self.read(Clone::clone)
    }

    // --- Profile and targets ---

    /// Replace the profile and recompute targets from it. This is the one
    /// cross-entity side effect in the store and fires on every profile
    /// save, even when the caller only changed an unrelated field.
    pub fn set_profile(&self, profile: UserProfile) {
        self.mutate(&[Collection::Profile, Collection::Targets], |s| {
            s.targets = Some(targets::derive_targets(&profile));
            s.profile = Some(profile);
        });
    }

    /// Normalize form input to metric and save it. Returns the stored profile.
    pub fn save_profile(&self, form: NewProfile) -> UserProfile {
        let profile = form.into_metric();
        self.set_profile(profile.clone());
        profile
    }

    /// Replace targets directly, bypassing derivation. Used for manual
    /// overrides; the override stands until the next profile save.
    pub fn set_targets(&self, targets: MacroTargets) {
        self.mutate(&[Collection::Targets], |s| s.targets = Some(targets));
    }

    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        self.read(|s| s.profile.clone())
    }

    #[must_use]
    pub fn targets(&self) -> Option<MacroTargets> {
        self.read(|s| s.targets)
    }

    // --- Weights (append-only list) ---

    pub fn add_weight(&self, date: NaiveDate, weight_kg: f64) -> String {
        let id = new_id();
        let entry = WeightEntry {
            id: id.clone(),
            date,
            weight_kg,
        };
        self.mutate(&[Collection::Weights], |s| s.weights.push(entry));
        id
    }

    pub fn remove_weight(&self, id: &str) {
        self.mutate(&[Collection::Weights], |s| s.weights.retain(|w| w.id != id));
    }

    #[must_use]
    pub fn weights(&self) -> Vec<WeightEntry> {
        self.read(|s| s.weights.clone())
    }

    #[must_use]
    pub fn has_weight_for(&self, date: NaiveDate) -> bool {
        self.read(|s| s.weights.iter().any(|w| w.date == date))
    }

    // --- Foods library ---

    pub fn add_food(&self, food: NewFoodItem) -> String {
        let id = new_id();
        let item = food.with_id(id.clone());
        self.mutate(&[Collection::Foods], |s| s.foods.insert(0, item));
        id
    }

    pub fn update_food(&self, food: FoodItem) {
        self.mutate(&[Collection::Foods], |s| {
            if let Some(slot) = s.foods.iter_mut().find(|f| f.id == food.id) {
                *slot = food;
            }
        });
    }

    pub fn remove_food(&self, id: &str) {
        self.mutate(&[Collection::Foods], |s| s.foods.retain(|f| f.id != id));
    }

    #[must_use]
    pub fn foods(&self) -> Vec<FoodItem> {
        self.read(|s| s.foods.clone())
    }

    #[must_use]
    pub fn find_food(&self, id: &str) -> Option<FoodItem> {
        self.read(|s| s.foods.iter().find(|f| f.id == id).cloned())
    }

    /// Case-insensitive name/brand substring search over the library.
    #[must_use]
    pub fn search_foods(&self, query: &str) -> Vec<FoodItem> {
        let needle = query.to_lowercase();
        self.read(|s| {
            s.foods
                .iter()
                .filter(|f| {
                    f.name.to_lowercase().contains(&needle)
                        || f.brand
                            .as_deref()
                            .is_some_and(|b| b.to_lowercase().contains(&needle))
                })
                .cloned()
                .collect()
        })
    }

    // --- Pantry (same shape as foods, independent collection) ---

    pub fn add_pantry_item(&self, food: NewFoodItem) -> String {
        let id = new_id();
        let item = food.with_id(id.clone());
        self.mutate(&[Collection::Pantry], |s| s.pantry.insert(0, item));
        id
    }

    pub fn update_pantry_item(&self, food: FoodItem) {
        self.mutate(&[Collection::Pantry], |s| {
            if let Some(slot) = s.pantry.iter_mut().find(|f| f.id == food.id) {
                *slot = food;
            }
        });
    }

    pub fn remove_pantry_item(&self, id: &str) {
        self.mutate(&[Collection::Pantry], |s| s.pantry.retain(|f| f.id != id));
    }

    #[must_use]
    pub fn pantry(&self) -> Vec<FoodItem> {
        self.read(|s| s.pantry.clone())
    }

    // --- Diary ---

    pub fn add_diary_entry(&self, entry: NewDiaryEntry) -> String {
        let id = new_id();
        let entry = DiaryEntry {
            id: id.clone(),
            date: entry.date,
            meal: entry.meal,
            food: entry.food,
            quantity: entry.quantity,
        };
        self.mutate(&[Collection::Diary], |s| s.diary.insert(0, entry));
        id
    }

    pub fn update_diary_entry(&self, entry: DiaryEntry) {
        self.mutate(&[Collection::Diary], |s| {
            if let Some(slot) = s.diary.iter_mut().find(|d| d.id == entry.id) {
                *slot = entry;
            }
        });
    }

    pub fn remove_diary_entry(&self, id: &str) {
        self.mutate(&[Collection::Diary], |s| s.diary.retain(|d| d.id != id));
    }

    #[must_use]
    pub fn diary(&self) -> Vec<DiaryEntry> {
        self.read(|s| s.diary.clone())
    }

    #[must_use]
    pub fn diary_for(&self, date: NaiveDate) -> Vec<DiaryEntry> {
        self.read(|s| s.diary.iter().filter(|d| d.date == date).cloned().collect())
    }

    #[must_use]
    pub fn find_diary_entry(&self, id: &str) -> Option<DiaryEntry> {
        self.read(|s| s.diary.iter().find(|d| d.id == id).cloned())
    }

    // --- Workouts ---

    pub fn add_workout(&self, workout: NewWorkoutSession) -> String {
        let id = new_id();
        let session = WorkoutSession {
            id: id.clone(),
            date: workout.date,
            title: workout.title,
            exercises: workout.exercises,
            cardio: workout.cardio,
        };
        self.mutate(&[Collection::Workouts], |s| s.workouts.insert(0, session));
        id
    }

    pub fn update_workout(&self, workout: WorkoutSession) {
        self.mutate(&[Collection::Workouts], |s| {
            if let Some(slot) = s.workouts.iter_mut().find(|w| w.id == workout.id) {
                *slot = workout;
            }
        });
    }

    pub fn remove_workout(&self, id: &str) {
        self.mutate(&[Collection::Workouts], |s| s.workouts.retain(|w| w.id != id));
    }

    #[must_use]
    pub fn workouts(&self) -> Vec<WorkoutSession> {
        self.read(|s| s.workouts.clone())
    }

    // --- Cookbook ---

    pub fn add_recipe(&self, recipe: NewRecipe) -> String {
        let id = new_id();
        let recipe = Recipe {
            id: id.clone(),
            name: recipe.name,
            meal_type: recipe.meal_type,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            calories: recipe.calories,
            protein_grams: recipe.protein_grams,
            carb_grams: recipe.carb_grams,
            fat_grams: recipe.fat_grams,
            servings: recipe.servings,
            created_at: Utc::now(),
        };
        self.mutate(&[Collection::Cookbook], |s| s.cookbook.insert(0, recipe));
        id
    }

    pub fn update_recipe(&self, recipe: Recipe) {
        self.mutate(&[Collection::Cookbook], |s| {
            if let Some(slot) = s.cookbook.iter_mut().find(|r| r.id == recipe.id) {
                *slot = recipe;
            }
        });
    }

    pub fn remove_recipe(&self, id: &str) {
        self.mutate(&[Collection::Cookbook], |s| s.cookbook.retain(|r| r.id != id));
    }

    #[must_use]
    pub fn cookbook(&self) -> Vec<Recipe> {
        self.read(|s| s.cookbook.clone())
    }

    #[must_use]
    pub fn find_recipe(&self, id: &str) -> Option<Recipe> {
        self.read(|s| s.cookbook.iter().find(|r| r.id == id).cloned())
    }

    // --- Workout split selection ---

    pub fn set_selected_split(&self, split_id: Option<String>) {
        self.mutate(&[Collection::SelectedSplit], |s| s.selected_split = split_id);
    }

    #[must_use]
    pub fn selected_split(&self) -> Option<String> {
        self.read(|s| s.selected_split.clone())
    }

    // --- Wholesale replacement (hydration and remote application) ---

    pub fn set_weights(&self, weights: Vec<WeightEntry>) {
        self.mutate(&[Collection::Weights], |s| s.weights = weights);
    }

    pub fn set_foods(&self, foods: Vec<FoodItem>) {
        self.mutate(&[Collection::Foods], |s| s.foods = foods);
    }

    pub fn set_diary(&self, diary: Vec<DiaryEntry>) {
        self.mutate(&[Collection::Diary], |s| s.diary = diary);
    }

    pub fn set_workouts(&self, workouts: Vec<WorkoutSession>) {
        self.mutate(&[Collection::Workouts], |s| s.workouts = workouts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityLevel, Gender, Goal, MealType, UnitSystem};

    fn sample_profile() -> NewProfile {
        NewProfile {
            name: Some("Sam".to_string()),
            unit_system: UnitSystem::Metric,
            height: 180.0,
            weight: 80.0,
            age: 30,
            gender: Gender::Male,
            activity_level: ActivityLevel::Moderate,
            goal: Goal::Maintain,
            goal_weight: None,
            cardio_days_per_week: None,
            training_days_per_week: None,
        }
    }

    fn sample_food(name: &str, calories: f64) -> NewFoodItem {
        NewFoodItem {
            name: name.to_string(),
            serving_size: "100 g".to_string(),
            calories,
            protein_grams: 10.0,
            carb_grams: 10.0,
            fat_grams: 2.0,
            ..NewFoodItem::default()
        }
    }

    #[test]
    fn test_first_run_seeds_food_library() {
        let store = Store::in_memory();
        let foods = store.foods();
        assert_eq!(foods.len(), 3);
        assert_eq!(foods[0].name, "Chicken Breast, cooked");
        assert!(store.weights().is_empty());
        assert!(store.diary().is_empty());
        assert!(store.profile().is_none());
    }

    #[test]
    fn test_set_profile_recomputes_targets() {
        let store = Store::in_memory();
        store.set_targets(MacroTargets {
            calories: 9999,
            protein_grams: 1,
            carb_grams: 1,
            fat_grams: 1,
        });

        let profile = store.save_profile(sample_profile());
        let targets = store.targets().unwrap();
        assert_eq!(targets, crate::targets::derive_targets(&profile));
        assert_eq!(targets.calories, 2759);
    }

    #[test]
    fn test_targets_override_survives_unrelated_mutations() {
        let store = Store::in_memory();
        store.save_profile(sample_profile());

        let manual = MacroTargets {
            calories: 2500,
            protein_grams: 180,
            carb_grams: 250,
            fat_grams: 70,
        };
        store.set_targets(manual);

        store.add_diary_entry(NewDiaryEntry {
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            meal: MealType::Lunch,
            food: sample_food("Rice", 130.0).with_id(new_id()),
            quantity: 1.0,
        });
        assert_eq!(store.targets().unwrap(), manual);

        // But a profile save always re-derives.
        let profile = store.save_profile(sample_profile());
        assert_eq!(
            store.targets().unwrap(),
            crate::targets::derive_targets(&profile)
        );
    }

    #[test]
    fn test_diary_snapshot_is_independent_of_library() {
        let store = Store::in_memory();
        let food_id = store.add_food(sample_food("Chicken", 165.0));
        let food = store.find_food(&food_id).unwrap();

        store.add_diary_entry(NewDiaryEntry {
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            meal: MealType::Dinner,
            food: food.clone(),
            quantity: 1.5,
        });

        let mut edited = food;
        edited.calories = 999.0;
        store.update_food(edited);

        let entry = &store.diary()[0];
        assert!((entry.food.calories - 165.0).abs() < f64::EPSILON);
        assert!((store.find_food(&food_id).unwrap().calories - 999.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_add_prepends_and_returns_id() {
        let store = Store::in_memory();
        let first = store.add_food(sample_food("First", 100.0));
        let second = store.add_food(sample_food("Second", 200.0));
        assert_ne!(first, second);

        let foods = store.foods();
        assert_eq!(foods[0].name, "Second");
        assert_eq!(foods[1].name, "First");
    }

    #[test]
    fn test_weights_append_in_order() {
        let store = Store::in_memory();
        store.add_weight(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(), 80.0);
        store.add_weight(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), 79.6);
        let weights = store.weights();
        assert!((weights[0].weight_kg - 80.0).abs() < f64::EPSILON);
        assert!((weights[1].weight_kg - 79.6).abs() < f64::EPSILON);
        assert!(store.has_weight_for(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()));
        assert!(!store.has_weight_for(NaiveDate::from_ymd_opt(2024, 6, 16).unwrap()));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = Store::in_memory();
        let id = store.add_pantry_item(sample_food("Eggs", 72.0));
        let before = store.pantry();

        store.remove_pantry_item("no-such-id");
        assert_eq!(store.pantry(), before);

        store.remove_pantry_item(&id);
        assert!(store.pantry().is_empty());
        store.remove_pantry_item(&id);
        assert!(store.pantry().is_empty());
    }

    #[test]
    fn test_update_missing_id_is_silent_noop() {
        let store = Store::in_memory();
        store.add_food(sample_food("Kept", 100.0));
        let before = store.foods();

        store.update_food(sample_food("Ghost", 1.0).with_id("no-such-id".to_string()));
        assert_eq!(store.foods(), before);
    }

    #[test]
    fn test_mutations_emit_collection_events() {
        let store = Store::in_memory();
        let mut events = store.subscribe();

        store.add_weight(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), 80.0);
        store.save_profile(sample_profile());
        store.set_selected_split(Some("ppl".to_string()));

        assert_eq!(events.try_recv().unwrap(), Collection::Weights);
        assert_eq!(events.try_recv().unwrap(), Collection::Profile);
        assert_eq!(events.try_recv().unwrap(), Collection::Targets);
        assert_eq!(events.try_recv().unwrap(), Collection::SelectedSplit);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_search_foods_matches_name_and_brand() {
        let store = Store::in_memory();
        store.add_food(NewFoodItem {
            brand: Some("Acme".to_string()),
            ..sample_food("Protein Bar", 200.0)
        });
        assert_eq!(store.search_foods("acme").len(), 1);
        assert_eq!(store.search_foods("protein").len(), 1);
        assert!(store.search_foods("nomatch").is_empty());
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");

        {
            let store = Store::open(&path).unwrap();
            store.save_profile(sample_profile());
            store.add_weight(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), 80.0);
        }

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.profile().unwrap().name.as_deref(), Some("Sam"));
        assert_eq!(reopened.weights().len(), 1);
        // Seeding must not run again on a persisted store.
        assert_eq!(reopened.foods().len(), 3);
    }
}
