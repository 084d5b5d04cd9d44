//! Rule-based recipe generation from pantry items. Template substitution and
//! keyword matching only; the "AI chef" in the UI copy is this.

use anyhow::{Result, bail};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::models::{FoodItem, MealType, NewRecipe};

const PROTEIN_KEYWORDS: &[&str] = &[
    "chicken", "turkey", "beef", "pork", "fish", "salmon", "tuna", "egg", "eggs", "tofu", "tempeh",
];
const CARB_KEYWORDS: &[&str] = &["rice", "pasta", "bread", "potato", "quinoa", "oats", "oatmeal"];
const VEG_KEYWORDS: &[&str] = &[
    "broccoli", "spinach", "lettuce", "tomato", "onion", "pepper", "carrot", "cucumber",
];
const NAME_SUFFIXES: &[&str] = &["", " Deluxe", " Supreme", " Classic", " Special"];

/// Generate 3-5 recipe variations from the pantry. Variation 0 uses the full
/// base ingredient set; later ones reshuffle and take a 60-90 % subset.
/// Ingredient macros are summed as-is, one pantry serving each.
pub fn generate_recipes<R: Rng>(
    pantry: &[FoodItem],
    meal_type: MealType,
    rng: &mut R,
) -> Result<Vec<NewRecipe>> {
    if pantry.is_empty() {
        bail!("Pantry is empty. Add ingredients before generating recipes");
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    let base_count = pantry
        .len()
        .min(2.max((pantry.len() as f64 * 0.6).floor() as usize));
    let mut shuffled: Vec<FoodItem> = pantry.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(base_count);
    let base = shuffled;

    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    let variation_count = 5.min(3.max((base.len() as f64 * 0.8).floor() as usize + 1));

    let mut recipes = Vec::with_capacity(variation_count);
    for variation in 0..variation_count {
        let chosen = if variation == 0 {
            base.clone()
        } else {
            let mut pool = base.clone();
            pool.shuffle(rng);
            let fraction = 0.6 + rng.random_range(0.0..0.3);
            #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
            let count = 2
                .max((base.len() as f64 * fraction).floor() as usize)
                .min(pool.len());
            pool.truncate(count);
            pool
        };

        let (calories, protein, carbs, fat) = sum_macros(&chosen);
        recipes.push(NewRecipe {
            name: recipe_name(&chosen, meal_type, variation),
            meal_type,
            instructions: cooking_instructions(&chosen, meal_type),
            ingredients: chosen,
            calories: calories.round(),
            protein_grams: (protein * 10.0).round() / 10.0,
            carb_grams: (carbs * 10.0).round() / 10.0,
            fat_grams: (fat * 10.0).round() / 10.0,
            servings: 1,
        });
    }

    Ok(recipes)
}

fn sum_macros(ingredients: &[FoodItem]) -> (f64, f64, f64, f64) {
    ingredients.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, f| {
        (
            acc.0 + f.calories,
            acc.1 + f.protein_grams,
            acc.2 + f.carb_grams,
            acc.3 + f.fat_grams,
        )
    })
}

/// Lowercased name up to the first comma: "Chicken Breast, cooked" -> "chicken breast".
fn main_name(food: &FoodItem) -> String {
    food.name
        .split(',')
        .next()
        .unwrap_or(&food.name)
        .trim()
        .to_lowercase()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

fn recipe_name(ingredients: &[FoodItem], meal_type: MealType, variation: usize) -> String {
    let mains: Vec<String> = ingredients.iter().map(main_name).collect();
    let has_protein = mains.iter().any(|m| contains_any(m, PROTEIN_KEYWORDS));
    let has_carb = mains.iter().any(|m| contains_any(m, CARB_KEYWORDS));
    let has_veg = mains.iter().any(|m| contains_any(m, VEG_KEYWORDS));
    let suffix = NAME_SUFFIXES.get(variation).copied().unwrap_or("");
    let meal = capitalize(meal_type.as_str());

    if ingredients.len() == 1 {
        format!("{} Power Bowl{suffix}", capitalize(&mains[0]))
    } else if ingredients.len() == 2 {
        format!(
            "{} & {} Fusion{suffix}",
            capitalize(&mains[0]),
            capitalize(&mains[1])
        )
    } else if has_protein && has_carb && has_veg {
        format!("Balanced {meal} Bowl{suffix}")
    } else if has_protein && has_carb {
        format!("Protein-Packed {meal}{suffix}")
    } else if has_protein {
        format!("High-Protein {meal} Plate{suffix}")
    } else {
        let first = capitalize(&mains[0]);
        match mains.get(1) {
            Some(second) => format!("{first} & {} {meal}{suffix}", capitalize(second)),
            None => format!("{first} Bowl{suffix}"),
        }
    }
}

fn cooking_instructions(ingredients: &[FoodItem], meal_type: MealType) -> Vec<String> {
    let names: Vec<&str> = ingredients
        .iter()
        .map(|i| i.name.split(',').next().unwrap_or(&i.name).trim())
        .collect();
    let main = names.first().copied().unwrap_or_default();

    let has_protein = ingredients.iter().any(|i| {
        let name = i.name.to_lowercase();
        contains_any(
            &name,
            &[
                "chicken", "turkey", "beef", "pork", "fish", "salmon", "tuna", "egg",
            ],
        )
    });
    let has_grains = ingredients.iter().any(|i| {
        let name = i.name.to_lowercase();
        contains_any(&name, &["rice", "pasta", "quinoa", "oats"])
    });

    let mut steps = Vec::new();
    match meal_type {
        MealType::Breakfast => {
            if has_protein {
                steps.push("Heat a non-stick pan over medium heat with a small amount of oil.".to_string());
                steps.push(format!(
                    "Cook the protein component ({main}) first until golden and cooked through."
                ));
                if ingredients.len() > 1 {
                    steps.push("Add remaining ingredients and cook together for 2-3 minutes.".to_string());
                }
                steps.push("Season with salt, pepper, and your favorite herbs.".to_string());
                steps.push("Serve hot for a nutritious start to your day!".to_string());
            } else {
                steps.push("Combine all ingredients in a bowl.".to_string());
                steps.push("Mix well until evenly distributed.".to_string());
                steps.push("If using oats or grains, let sit for a few minutes to absorb flavors.".to_string());
                steps.push("Enjoy your healthy breakfast!".to_string());
            }
        }
        MealType::Lunch | MealType::Dinner => {
            steps.push(
                "Prepare all ingredients: wash vegetables, cut proteins if needed, and measure grains."
                    .to_string(),
            );
            if has_protein {
                steps.push(
                    "Cook the protein first in a pan or skillet over medium-high heat until browned."
                        .to_string(),
                );
            }
            if has_grains {
                steps.push(
                    "If using grains, prepare according to package instructions or heat through."
                        .to_string(),
                );
            }
            if ingredients.len() > 2 {
                steps.push("Combine all ingredients in a large pan or bowl and mix well.".to_string());
            } else {
                steps.push(format!("Combine {} together.", names.join(" and ")));
            }
            steps.push("Adjust seasoning with salt, pepper, and herbs to taste.".to_string());
            steps.push("Plate and serve warm. Enjoy your balanced meal!".to_string());
        }
        MealType::Snack => {
            steps.push(format!("Prepare your ingredients: {}.", names.join(", ")));
            if ingredients.len() == 1 {
                steps.push("Portion into convenient snack-sized servings.".to_string());
            } else {
                steps.push("Mix or combine ingredients in a bowl.".to_string());
                steps.push("Portion into snack-sized servings for easy grab-and-go.".to_string());
            }
            steps.push("Store in an airtight container if not consuming immediately.".to_string());
            steps.push("Enjoy your healthy snack!".to_string());
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewFoodItem, new_id};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn food(name: &str, cal: f64, p: f64, c: f64, f: f64) -> FoodItem {
        NewFoodItem {
            name: name.to_string(),
            serving_size: "100 g".to_string(),
            calories: cal,
            protein_grams: p,
            carb_grams: c,
            fat_grams: f,
            ..NewFoodItem::default()
        }
        .with_id(new_id())
    }

    #[test]
    fn test_empty_pantry_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_recipes(&[], MealType::Lunch, &mut rng).is_err());
    }

    #[test]
    fn test_macros_are_summed_without_scaling() {
        // Two-item pantry: the base set is both items and variation 0 uses
        // the full base.
        let pantry = vec![
            food("Item A", 100.0, 10.0, 10.0, 2.0),
            food("Item B", 200.0, 20.0, 5.0, 8.0),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let recipes = generate_recipes(&pantry, MealType::Dinner, &mut rng).unwrap();

        let first = &recipes[0];
        assert_eq!(first.ingredients.len(), 2);
        assert!((first.calories - 300.0).abs() < f64::EPSILON);
        assert!((first.protein_grams - 30.0).abs() < f64::EPSILON);
        assert!((first.carb_grams - 15.0).abs() < f64::EPSILON);
        assert!((first.fat_grams - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_variation_count_and_sizes() {
        let pantry: Vec<FoodItem> = (0..6)
            .map(|i| food(&format!("Ingredient {i}"), 50.0, 5.0, 5.0, 1.0))
            .collect();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let recipes = generate_recipes(&pantry, MealType::Lunch, &mut rng).unwrap();
            assert!((3..=5).contains(&recipes.len()), "got {}", recipes.len());
            for recipe in &recipes {
                assert!(recipe.ingredients.len() >= 2);
                let (cal, p, c, f) = sum_macros(&recipe.ingredients);
                assert!((recipe.calories - cal.round()).abs() < f64::EPSILON);
                assert!((recipe.protein_grams - (p * 10.0).round() / 10.0).abs() < f64::EPSILON);
                assert!((recipe.carb_grams - (c * 10.0).round() / 10.0).abs() < f64::EPSILON);
                assert!((recipe.fat_grams - (f * 10.0).round() / 10.0).abs() < f64::EPSILON);
                assert_eq!(recipe.servings, 1);
                assert!(!recipe.instructions.is_empty());
            }
        }
    }

    #[test]
    fn test_variation_suffixes_follow_index() {
        let pantry: Vec<FoodItem> = (0..6)
            .map(|i| food(&format!("Ingredient {i}"), 50.0, 5.0, 5.0, 1.0))
            .collect();
        let mut rng = StdRng::seed_from_u64(3);
        let recipes = generate_recipes(&pantry, MealType::Snack, &mut rng).unwrap();

        assert!(!recipes[0].name.ends_with("Deluxe"));
        assert!(recipes[1].name.ends_with("Deluxe"));
        assert!(recipes[2].name.ends_with("Supreme"));
    }

    #[test]
    fn test_single_ingredient_name() {
        let name = recipe_name(
            &[food("Chicken Breast, cooked", 165.0, 31.0, 0.0, 3.6)],
            MealType::Lunch,
            0,
        );
        assert_eq!(name, "Chicken breast Power Bowl");
    }

    #[test]
    fn test_two_ingredient_fusion_name() {
        let name = recipe_name(
            &[
                food("Salmon, cooked", 208.0, 22.0, 0.0, 13.0),
                food("White Rice, cooked", 130.0, 2.4, 28.0, 0.3),
            ],
            MealType::Dinner,
            1,
        );
        assert_eq!(name, "Salmon & White rice Fusion Deluxe");
    }

    #[test]
    fn test_balanced_bowl_name() {
        let name = recipe_name(
            &[
                food("Chicken Breast, cooked", 165.0, 31.0, 0.0, 3.6),
                food("White Rice, cooked", 130.0, 2.4, 28.0, 0.3),
                food("Broccoli, cooked", 55.0, 3.7, 11.0, 0.6),
            ],
            MealType::Dinner,
            0,
        );
        assert_eq!(name, "Balanced Dinner Bowl");
    }

    #[test]
    fn test_breakfast_instructions_mention_protein() {
        let steps = cooking_instructions(
            &[
                food("Egg (large)", 72.0, 6.0, 0.4, 4.8),
                food("Spinach, raw", 23.0, 2.9, 3.6, 0.4),
            ],
            MealType::Breakfast,
        );
        assert!(steps[1].contains("Egg (large)"));
        assert!(steps.last().unwrap().contains("start to your day"));
    }

    #[test]
    fn test_lunch_instructions_end_with_plating() {
        let steps = cooking_instructions(
            &[
                food("Quinoa, cooked", 120.0, 4.4, 22.0, 1.9),
                food("Carrot, raw", 41.0, 0.9, 10.0, 0.2),
            ],
            MealType::Lunch,
        );
        assert!(steps.iter().any(|s| s.contains("Combine Quinoa and Carrot")));
        assert!(steps.last().unwrap().contains("Plate and serve warm"));
    }
}
