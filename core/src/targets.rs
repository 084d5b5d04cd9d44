//! Daily energy expenditure and macro target derivation.

use crate::models::{ActivityLevel, Gender, Goal, MacroTargets, UserProfile};

pub const LBS_PER_KG: f64 = 2.204_622_621_8;
pub const CM_PER_INCH: f64 = 2.54;

#[must_use]
pub fn lbs_to_kg(lbs: f64) -> f64 {
    lbs / LBS_PER_KG
}

#[must_use]
pub fn kg_to_lbs(kg: f64) -> f64 {
    kg * LBS_PER_KG
}

#[must_use]
pub fn inches_to_cm(inches: f64) -> f64 {
    inches * CM_PER_INCH
}

#[must_use]
pub fn cm_to_inches(cm: f64) -> f64 {
    cm / CM_PER_INCH
}

fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::Active => 1.725,
        ActivityLevel::VeryActive => 1.9,
    }
}

/// Total daily energy expenditure from the Mifflin-St Jeor equation,
/// rounded to the nearest calorie.
///
/// Non-male genders use the female offset.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn calculate_tdee(profile: &UserProfile) -> i64 {
    let s = match profile.gender {
        Gender::Male => 5.0,
        Gender::Female | Gender::Other => -161.0,
    };
    let bmr = 10.0 * profile.weight_kg + 6.25 * profile.height_cm - 5.0 * f64::from(profile.age) + s;
    (bmr * activity_multiplier(profile.activity_level)).round() as i64
}

/// Derive default macro targets from a profile: TDEE adjusted for goal,
/// protein at 2.0 g/kg, fat at 0.8 g/kg, remaining calories as carbs.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn derive_targets(profile: &UserProfile) -> MacroTargets {
    let tdee = calculate_tdee(profile);
    let calories = match profile.goal {
        Goal::Cut => (tdee as f64 * 0.8).round() as i64,
        Goal::Bulk => (tdee as f64 * 1.1).round() as i64,
        Goal::Maintain => tdee,
    };

    let protein_grams = (profile.weight_kg * 2.0).round() as i64;
    let fat_grams = (profile.weight_kg * 0.8).round() as i64;
    let remaining = calories - (protein_grams * 4 + fat_grams * 9);
    let carb_grams = (remaining as f64 / 4.0).round().max(0.0) as i64;

    MacroTargets {
        calories,
        protein_grams,
        carb_grams,
        fat_grams,
    }
}
