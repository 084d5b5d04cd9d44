//! Built-in reference data: the first-run food seed, the quick-add food
//! suggestion list, and the workout split presets.

use crate::models::NewFoodItem;

/// The foods library a brand-new store starts with. Fixed so first-run
/// behavior is deterministic.
#[must_use]
pub fn default_food_library() -> Vec<NewFoodItem> {
    vec![
        food("Chicken Breast, cooked", "100 g", 165.0, 31.0, 0.0, 3.6),
        food("White Rice, cooked", "100 g", 130.0, 2.4, 28.0, 0.3),
        food("Olive Oil", "1 tbsp (14 g)", 119.0, 0.0, 0.0, 13.5),
    ]
}

fn food(name: &str, serving: &str, cal: f64, p: f64, c: f64, f: f64) -> NewFoodItem {
    NewFoodItem {
        name: name.to_string(),
        serving_size: serving.to_string(),
        calories: cal,
        protein_grams: p,
        carb_grams: c,
        fat_grams: f,
        ..NewFoodItem::default()
    }
}

/// Common foods offered for quick library/pantry adds.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn food_suggestions() -> Vec<NewFoodItem> {
    vec![
        // Proteins
        food("Chicken Breast, cooked", "100 g", 165.0, 31.0, 0.0, 3.6),
        food("Chicken Thigh, cooked", "100 g", 209.0, 26.0, 0.0, 10.9),
        food("Ground Turkey, 93/7", "100 g", 189.0, 27.0, 0.0, 8.0),
        food("Salmon, cooked", "100 g", 208.0, 22.0, 0.0, 13.0),
        food("Tuna, canned in water", "100 g", 116.0, 26.0, 0.0, 0.8),
        food("Shrimp, cooked", "100 g", 99.0, 24.0, 0.2, 0.3),
        food("Ground Beef 90/10, cooked", "100 g", 217.0, 26.0, 0.0, 12.0),
        food("Steak, Sirloin, cooked", "100 g", 206.0, 28.0, 0.0, 9.0),
        food("Pork Tenderloin, cooked", "100 g", 162.0, 26.0, 0.0, 5.5),
        food("Egg (large)", "1 egg (50 g)", 72.0, 6.0, 0.4, 4.8),
        food("Egg Whites", "100 g", 52.0, 11.0, 0.7, 0.2),
        food("Tofu, firm", "100 g", 144.0, 17.0, 3.0, 8.0),
        food("Tempeh, cooked", "100 g", 193.0, 19.0, 9.0, 11.0),
        // Dairy
        food("Greek Yogurt, nonfat", "170 g (6 oz)", 100.0, 17.0, 6.0, 0.0),
        food("Cottage Cheese, low fat", "100 g", 72.0, 12.0, 3.0, 1.0),
        food("Milk, 2%", "1 cup (244 g)", 122.0, 8.0, 12.0, 5.0),
        food("Cheese, Cheddar", "28 g (1 oz)", 113.0, 7.0, 0.4, 9.0),
        branded("Whey Protein", "Generic", "1 scoop (30 g)", 120.0, 24.0, 3.0, 2.0),
        // Grains & carbs
        food("White Rice, cooked", "100 g", 130.0, 2.4, 28.0, 0.3),
        food("Brown Rice, cooked", "100 g", 123.0, 2.7, 25.6, 1.0),
        food("Quinoa, cooked", "100 g", 120.0, 4.4, 22.0, 1.9),
        food("Oats, dry", "40 g (1/2 cup)", 150.0, 5.0, 27.0, 3.0),
        food("Pasta, cooked", "100 g", 131.0, 5.0, 25.0, 1.1),
        food("Bread, whole wheat", "1 slice (28 g)", 80.0, 4.0, 14.0, 1.0),
        food("Potato, baked", "100 g", 93.0, 2.5, 21.0, 0.1),
        food("Sweet Potato, baked", "100 g", 90.0, 2.0, 21.0, 0.2),
        // Vegetables & fruit
        food("Broccoli, cooked", "100 g", 55.0, 3.7, 11.0, 0.6),
        food("Spinach, raw", "100 g", 23.0, 2.9, 3.6, 0.4),
        food("Bell Pepper", "100 g", 31.0, 1.0, 6.0, 0.3),
        food("Carrot, raw", "100 g", 41.0, 0.9, 10.0, 0.2),
        food("Banana", "1 medium (118 g)", 105.0, 1.3, 27.0, 0.4),
        food("Apple", "1 medium (182 g)", 95.0, 0.5, 25.0, 0.3),
        food("Blueberries", "100 g", 57.0, 0.7, 14.0, 0.3),
        // Fats
        food("Olive Oil", "1 tbsp (14 g)", 119.0, 0.0, 0.0, 13.5),
        food("Peanut Butter", "2 tbsp (32 g)", 188.0, 8.0, 6.0, 16.0),
        food("Almonds", "28 g (1 oz)", 164.0, 6.0, 6.0, 14.0),
        food("Avocado", "1/2 fruit (100 g)", 160.0, 2.0, 9.0, 15.0),
    ]
}

fn branded(name: &str, brand: &str, serving: &str, cal: f64, p: f64, c: f64, f: f64) -> NewFoodItem {
    NewFoodItem {
        brand: Some(brand.to_string()),
        ..food(name, serving, cal, p, c, f)
    }
}

// --- Workout split presets ---

#[derive(Debug, Clone)]
pub struct WorkoutSplit {
    pub id: &'static str,
    pub name: &'static str,
    pub days: Vec<SplitDay>,
}

#[derive(Debug, Clone)]
pub struct SplitDay {
    pub name: &'static str,
    pub exercises: Vec<&'static str>,
}

#[must_use]
pub fn workout_splits() -> Vec<WorkoutSplit> {
    vec![
        WorkoutSplit {
            id: "ppl",
            name: "Push/Pull/Legs (PPL)",
            days: vec![
                SplitDay {
                    name: "Push Day",
                    exercises: vec![
                        "Barbell Bench Press",
                        "Overhead Press",
                        "Incline Dumbbell Press",
                        "Lateral Raises",
                        "Tricep Pushdowns",
                        "Cable Flyes",
                    ],
                },
                SplitDay {
                    name: "Pull Day",
                    exercises: vec![
                        "Deadlifts",
                        "Barbell Rows",
                        "Pull-ups / Lat Pulldowns",
                        "Cable Rows",
                        "Face Pulls",
                        "Barbell Curls",
                    ],
                },
                SplitDay {
                    name: "Leg Day",
                    exercises: vec![
                        "Squats",
                        "Romanian Deadlifts",
                        "Leg Press",
                        "Leg Curls",
                        "Calf Raises",
                        "Hip Thrusts",
                    ],
                },
            ],
        },
        WorkoutSplit {
            id: "upper-lower",
            name: "Upper/Lower",
            days: vec![
                SplitDay {
                    name: "Upper Day",
                    exercises: vec![
                        "Barbell Bench Press",
                        "Barbell Rows",
                        "Overhead Press",
                        "Lat Pulldowns",
                        "Barbell Curls",
                        "Tricep Pushdowns",
                    ],
                },
                SplitDay {
                    name: "Lower Day",
                    exercises: vec![
                        "Squats",
                        "Romanian Deadlifts",
                        "Leg Press",
                        "Leg Curls",
                        "Calf Raises",
                    ],
                },
            ],
        },
    ]
}

#[must_use]
pub fn find_split(id: &str) -> Option<WorkoutSplit> {
    workout_splits().into_iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_library_is_fixed() {
        let seed = default_food_library();
        assert_eq!(seed.len(), 3);
        assert_eq!(seed[0].name, "Chicken Breast, cooked");
        assert!((seed[0].calories - 165.0).abs() < f64::EPSILON);
        assert_eq!(seed[1].name, "White Rice, cooked");
        assert!((seed[1].carb_grams - 28.0).abs() < f64::EPSILON);
        assert_eq!(seed[2].name, "Olive Oil");
        assert_eq!(seed[2].serving_size, "1 tbsp (14 g)");
        assert!((seed[2].fat_grams - 13.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_find_split() {
        assert!(find_split("ppl").is_some());
        assert!(find_split("upper-lower").is_some());
        assert!(find_split("bro-split").is_none());
    }

    #[test]
    fn test_suggestions_have_names_and_servings() {
        for s in food_suggestions() {
            assert!(!s.name.is_empty());
            assert!(!s.serving_size.is_empty());
            assert!(s.calories >= 0.0);
        }
    }
}
