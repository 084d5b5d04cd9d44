use anyhow::{Context, Result};

use fitlog_core::models::{MealType, NewDiaryEntry, NewFoodItem, NewRecipe, Recipe};
use fitlog_core::recipes::generate_recipes;
use fitlog_core::store::Store;

use super::helpers::{resolve_id, short_id, truncate};

pub(crate) fn cmd_kitchen_generate(
    store: &Store,
    meal: &str,
    save: Option<usize>,
    json: bool,
) -> Result<()> {
    let meal: MealType = meal.parse()?;
    let pantry = store.pantry();
    let variations = generate_recipes(&pantry, meal, &mut rand::rng())?;

    if let Some(index) = save {
        let variation = variations
            .into_iter()
            .nth(index.checked_sub(1).context("--save is 1-based")?)
            .context("No such variation; generate first to see how many there are")?;
        let name = variation.name.clone();
        let id = store.add_recipe(variation);
        if json {
            println!("{}", serde_json::json!({ "id": id, "name": name }));
        } else {
            println!("Saved '{name}' to the cookbook ({})", short_id(&id));
        }
        return Ok(());
    }

    if json {
        let values: Vec<serde_json::Value> = variations
            .iter()
            .map(|r| {
                serde_json::json!({
                    "name": r.name,
                    "meal_type": r.meal_type,
                    "calories": r.calories,
                    "protein_grams": r.protein_grams,
                    "carb_grams": r.carb_grams,
                    "fat_grams": r.fat_grams,
                    "ingredients": r.ingredients.iter().map(|f| f.name.clone()).collect::<Vec<_>>(),
                    "instructions": r.instructions,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    for (i, recipe) in variations.iter().enumerate() {
        print_variation(i + 1, recipe);
    }
    println!("\nRun again with --save <n> to keep a variation (each run generates a fresh batch).");
    Ok(())
}

fn print_variation(index: usize, recipe: &NewRecipe) {
    println!("\n[{index}] {}", recipe.name);
    println!(
        "    {:.0} kcal | P {:.1} g | C {:.1} g | F {:.1} g | serves {}",
        recipe.calories, recipe.protein_grams, recipe.carb_grams, recipe.fat_grams, recipe.servings
    );
    println!(
        "    Ingredients: {}",
        recipe
            .ingredients
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for (step, text) in recipe.instructions.iter().enumerate() {
        println!("    {}. {text}", step + 1);
    }
}

pub(crate) fn cmd_cookbook_list(store: &Store, json: bool) -> Result<()> {
    let cookbook = store.cookbook();

    if json {
        println!("{}", serde_json::to_string_pretty(&cookbook)?);
        return Ok(());
    }
    if cookbook.is_empty() {
        eprintln!("The cookbook is empty. Generate recipes with `fitlog kitchen generate`.");
        return Ok(());
    }

    for recipe in &cookbook {
        println!(
            "{}  {}  [{}]  {:.0} kcal | P {:.1} | C {:.1} | F {:.1}",
            short_id(&recipe.id),
            truncate(&recipe.name, 40),
            recipe.meal_type,
            recipe.calories,
            recipe.protein_grams,
            recipe.carb_grams,
            recipe.fat_grams,
        );
    }
    Ok(())
}

pub(crate) fn cmd_cookbook_remove(store: &Store, id: &str, json: bool) -> Result<()> {
    let cookbook = store.cookbook();
    let id = resolve_id(cookbook.iter().map(|r| r.id.as_str()), id)?;
    store.remove_recipe(&id);

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Removed recipe {}", short_id(&id));
    }
    Ok(())
}

/// Log a saved recipe to the diary as one combined food snapshot.
pub(crate) fn cmd_cookbook_log(
    store: &Store,
    id: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let cookbook = store.cookbook();
    let id = resolve_id(cookbook.iter().map(|r| r.id.as_str()), id)?;
    let recipe = store.find_recipe(&id).context("Recipe not found")?;

    let date = super::helpers::parse_date(date)?;
    let food = recipe_food(&recipe);
    let entry_id = store.add_diary_entry(NewDiaryEntry {
        date,
        meal: recipe.meal_type,
        food,
        quantity: 1.0,
    });

    if json {
        println!("{}", serde_json::json!({ "id": entry_id, "recipe": recipe.name }));
    } else {
        println!("{} added to your diary for {date}", recipe.name);
    }
    Ok(())
}

fn recipe_food(recipe: &Recipe) -> fitlog_core::models::FoodItem {
    NewFoodItem {
        name: recipe.name.clone(),
        serving_size: format!("{} serving(s)", recipe.servings),
        calories: recipe.calories,
        protein_grams: recipe.protein_grams,
        carb_grams: recipe.carb_grams,
        fat_grams: recipe.fat_grams,
        ..NewFoodItem::default()
    }
    .with_id(fitlog_core::models::new_id())
}
