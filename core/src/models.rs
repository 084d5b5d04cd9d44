use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    Metric,
    Imperial,
}

impl Default for UnitSystem {
    fn default() -> Self {
        Self::Metric
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Cut,
    Maintain,
    Bulk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [Self; 4] = [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snack];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            _ => bail!("Invalid meal type '{s}'. Must be one of: breakfast, lunch, dinner, snack"),
        }
    }
}

impl FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            _ => bail!("Invalid gender '{s}'. Must be one of: male, female, other"),
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sedentary" => Ok(Self::Sedentary),
            "light" => Ok(Self::Light),
            "moderate" => Ok(Self::Moderate),
            "active" => Ok(Self::Active),
            "very_active" | "very-active" => Ok(Self::VeryActive),
            _ => bail!(
                "Invalid activity level '{s}'. Must be one of: sedentary, light, moderate, active, very_active"
            ),
        }
    }
}

impl FromStr for Goal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cut" => Ok(Self::Cut),
            "maintain" => Ok(Self::Maintain),
            "bulk" => Ok(Self::Bulk),
            _ => bail!("Invalid goal '{s}'. Must be one of: cut, maintain, bulk"),
        }
    }
}

impl FromStr for UnitSystem {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            _ => bail!("Invalid unit system '{s}'. Must be 'metric' or 'imperial'"),
        }
    }
}

/// User profile. Height and weight are always stored metric; `unit_system`
/// only records the user's display preference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub unit_system: UnitSystem,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub age: u32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardio_days_per_week: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_days_per_week: Option<u32>,
}

/// Profile form input before storage normalization. Height and weight are
/// interpreted in `unit_system` units (inches/lbs when imperial).
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub name: Option<String>,
    pub unit_system: UnitSystem,
    pub height: f64,
    pub weight: f64,
    pub age: u32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    pub goal_weight: Option<f64>,
    pub cardio_days_per_week: Option<u32>,
    pub training_days_per_week: Option<u32>,
}

impl NewProfile {
    /// Normalize to metric storage units.
    #[must_use]
    pub fn into_metric(self) -> UserProfile {
        let (height_cm, weight_kg, goal_weight_kg) = match self.unit_system {
            UnitSystem::Metric => (self.height, self.weight, self.goal_weight),
            UnitSystem::Imperial => (
                crate::targets::inches_to_cm(self.height),
                crate::targets::lbs_to_kg(self.weight),
                self.goal_weight.map(crate::targets::lbs_to_kg),
            ),
        };
        UserProfile {
            name: self.name,
            unit_system: self.unit_system,
            height_cm,
            weight_kg,
            age: self.age,
            gender: self.gender,
            activity_level: self.activity_level,
            goal: self.goal,
            goal_weight_kg,
            cardio_days_per_week: self.cardio_days_per_week,
            training_days_per_week: self.training_days_per_week,
        }
    }
}

/// Daily calorie and macro targets. Derived from the profile by default, but
/// a manual override replaces the derived values until the next profile save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub calories: i64,
    pub protein_grams: i64,
    pub carb_grams: i64,
    pub fat_grams: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub id: String,
    pub date: NaiveDate,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Free-text serving label, e.g. "100 g" or "1 scoop (30 g)".
    pub serving_size: String,
    pub calories: f64,
    pub protein_grams: f64,
    pub carb_grams: f64,
    pub fat_grams: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugars_grams: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber_grams: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sodium_mg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturated_fat_grams: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trans_fat_grams: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cholesterol_mg: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewFoodItem {
    pub name: String,
    pub brand: Option<String>,
    pub serving_size: String,
    pub calories: f64,
    pub protein_grams: f64,
    pub carb_grams: f64,
    pub fat_grams: f64,
    pub sugars_grams: Option<f64>,
    pub fiber_grams: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub saturated_fat_grams: Option<f64>,
    pub trans_fat_grams: Option<f64>,
    pub cholesterol_mg: Option<f64>,
}

impl NewFoodItem {
    #[must_use]
    pub fn with_id(self, id: String) -> FoodItem {
        FoodItem {
            id,
            name: self.name,
            brand: self.brand,
            serving_size: self.serving_size,
            calories: self.calories,
            protein_grams: self.protein_grams,
            carb_grams: self.carb_grams,
            fat_grams: self.fat_grams,
            sugars_grams: self.sugars_grams,
            fiber_grams: self.fiber_grams,
            sodium_mg: self.sodium_mg,
            saturated_fat_grams: self.saturated_fat_grams,
            trans_fat_grams: self.trans_fat_grams,
            cholesterol_mg: self.cholesterol_mg,
        }
    }
}

/// A logged meal. `food` is a value snapshot of the food at logging time;
/// later edits to the library item must not change past diary entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: String,
    pub date: NaiveDate,
    pub meal: MealType,
    pub food: FoodItem,
    /// Serving multiplier (1 = one serving of `food.serving_size`).
    pub quantity: f64,
}

#[derive(Debug, Clone)]
pub struct NewDiaryEntry {
    pub date: NaiveDate,
    pub meal: MealType,
    pub food: FoodItem,
    pub quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetType {
    Normal,
    Dropset,
    Superset,
    Amrap,
}

impl SetType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Dropset => "dropset",
            Self::Superset => "superset",
            Self::Amrap => "amrap",
        }
    }
}

impl FromStr for SetType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "dropset" => Ok(Self::Dropset),
            "superset" => Ok(Self::Superset),
            "amrap" => Ok(Self::Amrap),
            _ => bail!("Invalid set type '{s}'. Must be one of: normal, dropset, superset, amrap"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    pub id: String,
    pub set_type: SetType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_failure: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle_group: Option<String>,
    pub sets: Vec<ExerciseSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardioEntry {
    pub id: String,
    pub activity: String,
    pub duration_minutes: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories_burned: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub exercises: Vec<ExerciseEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardio: Option<Vec<CardioEntry>>,
}

#[derive(Debug, Clone)]
pub struct NewWorkoutSession {
    pub date: DateTime<Utc>,
    pub title: Option<String>,
    pub exercises: Vec<ExerciseEntry>,
    pub cardio: Option<Vec<CardioEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub meal_type: MealType,
    /// Ingredient snapshots taken at generation time.
    pub ingredients: Vec<FoodItem>,
    pub instructions: Vec<String>,
    pub calories: f64,
    pub protein_grams: f64,
    pub carb_grams: f64,
    pub fat_grams: f64,
    pub servings: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub meal_type: MealType,
    pub ingredients: Vec<FoodItem>,
    pub instructions: Vec<String>,
    pub calories: f64,
    pub protein_grams: f64,
    pub carb_grams: f64,
    pub fat_grams: f64,
    pub servings: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConversation {
    pub id: String,
    pub user_id: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An authenticated user as reported by the identity gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// Fresh opaque id for a new record. Ids are never reused or renumbered.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// --- Validation helpers (CLI boundary; the store itself stays permissive) ---

pub fn validate_food_data(food: &NewFoodItem) -> Result<()> {
    if food.name.trim().is_empty() {
        bail!("Food name must not be empty");
    }
    if food.calories < 0.0 {
        bail!("calories must not be negative");
    }
    if food.protein_grams < 0.0 || food.carb_grams < 0.0 || food.fat_grams < 0.0 {
        bail!("macro grams must not be negative");
    }
    Ok(())
}

pub fn validate_quantity(quantity: f64) -> Result<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        bail!("Quantity must be a positive number");
    }
    Ok(())
}

pub fn validate_weight_kg(weight_kg: f64) -> Result<()> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        bail!("Weight must be greater than 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meal_type_parse() {
        assert_eq!("breakfast".parse::<MealType>().unwrap(), MealType::Breakfast);
        assert_eq!("Lunch".parse::<MealType>().unwrap(), MealType::Lunch);
        assert_eq!("DINNER".parse::<MealType>().unwrap(), MealType::Dinner);
        assert!("brunch".parse::<MealType>().is_err());
        assert!("".parse::<MealType>().is_err());
    }

    #[test]
    fn test_activity_level_parse_accepts_hyphen() {
        assert_eq!(
            "very-active".parse::<ActivityLevel>().unwrap(),
            ActivityLevel::VeryActive
        );
        assert_eq!(
            "very_active".parse::<ActivityLevel>().unwrap(),
            ActivityLevel::VeryActive
        );
    }

    #[test]
    fn test_enum_serde_renames() {
        assert_eq!(
            serde_json::to_string(&ActivityLevel::VeryActive).unwrap(),
            "\"very_active\""
        );
        assert_eq!(serde_json::to_string(&Goal::Cut).unwrap(), "\"cut\"");
        assert_eq!(serde_json::to_string(&SetType::Amrap).unwrap(), "\"amrap\"");
    }

    #[test]
    fn test_new_profile_metric_passthrough() {
        let profile = NewProfile {
            name: Some("Sam".to_string()),
            unit_system: UnitSystem::Metric,
            height: 180.0,
            weight: 80.0,
            age: 30,
            gender: Gender::Male,
            activity_level: ActivityLevel::Moderate,
            goal: Goal::Maintain,
            goal_weight: Some(78.0),
            cardio_days_per_week: None,
            training_days_per_week: Some(4),
        }
        .into_metric();
        assert!((profile.height_cm - 180.0).abs() < f64::EPSILON);
        assert!((profile.weight_kg - 80.0).abs() < f64::EPSILON);
        assert_eq!(profile.goal_weight_kg, Some(78.0));
    }

    #[test]
    fn test_new_profile_imperial_normalized() {
        let profile = NewProfile {
            name: None,
            unit_system: UnitSystem::Imperial,
            height: 71.0,  // inches
            weight: 176.0, // lbs
            age: 30,
            gender: Gender::Female,
            activity_level: ActivityLevel::Light,
            goal: Goal::Cut,
            goal_weight: Some(154.0),
            cardio_days_per_week: Some(2),
            training_days_per_week: None,
        }
        .into_metric();
        assert!((profile.height_cm - 180.34).abs() < 0.01);
        assert!((profile.weight_kg - 79.832).abs() < 0.01);
        assert!((profile.goal_weight_kg.unwrap() - 69.853).abs() < 0.01);
        // Preference survives normalization for display purposes.
        assert_eq!(profile.unit_system, UnitSystem::Imperial);
    }

    #[test]
    fn test_validate_food_data() {
        let mut food = NewFoodItem {
            name: "Chicken Breast".to_string(),
            serving_size: "100 g".to_string(),
            calories: 165.0,
            protein_grams: 31.0,
            ..NewFoodItem::default()
        };
        assert!(validate_food_data(&food).is_ok());

        food.name = "   ".to_string();
        assert!(validate_food_data(&food).is_err());

        food.name = "Bad".to_string();
        food.calories = -1.0;
        assert!(validate_food_data(&food).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1.5).is_ok());
        assert!(validate_quantity(0.0).is_err());
        assert!(validate_quantity(-2.0).is_err());
        assert!(validate_quantity(f64::NAN).is_err());
    }

    #[test]
    fn test_food_item_optional_fields_omitted() {
        let food = NewFoodItem {
            name: "Oats".to_string(),
            serving_size: "40 g".to_string(),
            calories: 150.0,
            protein_grams: 5.0,
            carb_grams: 27.0,
            fat_grams: 3.0,
            ..NewFoodItem::default()
        }
        .with_id("f1".to_string());
        let json = serde_json::to_string(&food).unwrap();
        assert!(!json.contains("brand"));
        assert!(!json.contains("sodium_mg"));
    }
}
