use anyhow::{Context, Result};

use fitlog_core::catalog;
use fitlog_core::models::{NewFoodItem, validate_food_data};
use fitlog_core::store::Store;

use super::helpers::{print_food_table, resolve_id, short_id};

pub(crate) struct FoodFields {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub serving: String,
    pub calories: Option<f64>,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub sugars: Option<f64>,
    pub fiber: Option<f64>,
    pub sodium: Option<f64>,
    pub saturated_fat: Option<f64>,
    pub trans_fat: Option<f64>,
    pub cholesterol: Option<f64>,
    pub suggestion: Option<String>,
}

impl FoodFields {
    /// Build the food either from a catalog suggestion or from the flags.
    fn into_item(self) -> Result<NewFoodItem> {
        if let Some(query) = &self.suggestion {
            let needle = query.to_lowercase();
            let item = catalog::food_suggestions()
                .into_iter()
                .find(|s| s.name.to_lowercase().contains(&needle))
                .with_context(|| {
                    format!("No suggestion matches '{query}'. See `fitlog food suggestions`")
                })?;
            return Ok(item);
        }

        let item = NewFoodItem {
            name: self.name.context("--name is required")?,
            brand: self.brand,
            serving_size: self.serving,
            calories: self.calories.context("--calories is required")?,
            protein_grams: self.protein,
            carb_grams: self.carbs,
            fat_grams: self.fat,
            sugars_grams: self.sugars,
            fiber_grams: self.fiber,
            sodium_mg: self.sodium,
            saturated_fat_grams: self.saturated_fat,
            trans_fat_grams: self.trans_fat,
            cholesterol_mg: self.cholesterol,
        };
        validate_food_data(&item)?;
        Ok(item)
    }
}

/// Which of the two food-shaped collections a command operates on.
#[derive(Clone, Copy)]
pub(crate) enum FoodTarget {
    Library,
    Pantry,
}

impl FoodTarget {
    fn label(self) -> &'static str {
        match self {
            Self::Library => "foods library",
            Self::Pantry => "pantry",
        }
    }
}

pub(crate) fn cmd_food_add(
    store: &Store,
    target: FoodTarget,
    fields: FoodFields,
    json: bool,
) -> Result<()> {
    let item = fields.into_item()?;
    let name = item.name.clone();
    let id = match target {
        FoodTarget::Library => store.add_food(item),
        FoodTarget::Pantry => store.add_pantry_item(item),
    };

    if json {
        println!("{}", serde_json::json!({ "id": id, "name": name }));
    } else {
        println!("Added '{name}' to the {} ({})", target.label(), short_id(&id));
    }
    Ok(())
}

pub(crate) fn cmd_food_list(
    store: &Store,
    target: FoodTarget,
    search: Option<&str>,
    json: bool,
) -> Result<()> {
    let items = match (target, search) {
        (FoodTarget::Library, Some(query)) => store.search_foods(query),
        (FoodTarget::Library, None) => store.foods(),
        (FoodTarget::Pantry, query) => {
            let mut items = store.pantry();
            if let Some(query) = query {
                let needle = query.to_lowercase();
                items.retain(|f| f.name.to_lowercase().contains(&needle));
            }
            items
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        eprintln!("Nothing in the {} yet.", target.label());
    } else {
        print_food_table(&items);
    }
    Ok(())
}

pub(crate) fn cmd_food_remove(
    store: &Store,
    target: FoodTarget,
    id: &str,
    json: bool,
) -> Result<()> {
    let items = match target {
        FoodTarget::Library => store.foods(),
        FoodTarget::Pantry => store.pantry(),
    };
    let id = resolve_id(items.iter().map(|f| f.id.as_str()), id)?;
    match target {
        FoodTarget::Library => store.remove_food(&id),
        FoodTarget::Pantry => store.remove_pantry_item(&id),
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Removed {} from the {}", short_id(&id), target.label());
    }
    Ok(())
}

pub(crate) fn cmd_food_suggestions(search: Option<&str>, json: bool) -> Result<()> {
    let mut suggestions = catalog::food_suggestions();
    if let Some(query) = search {
        let needle = query.to_lowercase();
        suggestions.retain(|s| s.name.to_lowercase().contains(&needle));
    }

    if json {
        let values: Vec<serde_json::Value> = suggestions
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "brand": s.brand,
                    "serving_size": s.serving_size,
                    "calories": s.calories,
                    "protein_grams": s.protein_grams,
                    "carb_grams": s.carb_grams,
                    "fat_grams": s.fat_grams,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
    } else if suggestions.is_empty() {
        eprintln!("No suggestions match.");
    } else {
        let items: Vec<_> = suggestions
            .into_iter()
            .map(|s| s.with_id(String::new()))
            .collect();
        print_food_table(&items);
        println!("Add one with `fitlog food add --suggestion <name>` (or `fitlog pantry add`).");
    }
    Ok(())
}
