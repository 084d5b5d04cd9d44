use anyhow::{Context, Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::models::{FoodItem, MealType, NewDiaryEntry, validate_quantity};
use fitlog_core::store::Store;

use super::helpers::{parse_date, print_food_table, prompt_choice, resolve_id, short_id, truncate};

/// Log a food from the library into the diary, snapshotting it at log time.
pub(crate) fn cmd_log(
    store: &Store,
    food: &str,
    meal: &str,
    quantity: f64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let meal: MealType = meal.parse()?;
    validate_quantity(quantity)?;
    let date = parse_date(date)?;

    let food = pick_food(store, food)?;
    let entry = NewDiaryEntry {
        date,
        meal,
        food: food.clone(),
        quantity,
    };
    let id = store.add_diary_entry(entry);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": id,
                "date": date,
                "meal": meal,
                "food": food.name,
                "quantity": quantity,
                "calories": food.calories * quantity,
            })
        );
    } else {
        println!(
            "Logged {:.1} x {} for {meal} on {date} ({:.0} kcal)",
            quantity,
            food.name,
            food.calories * quantity
        );
    }
    Ok(())
}

fn pick_food(store: &Store, query: &str) -> Result<FoodItem> {
    if let Some(exact) = store.find_food(query) {
        return Ok(exact);
    }

    let matches = store.search_foods(query);
    match matches.len() {
        0 => bail!("No food matches '{query}'. Add one with `fitlog food add`"),
        1 => Ok(matches.into_iter().next().context("match vanished")?),
        _ => {
            print_food_table(&matches);
            let choice = prompt_choice(matches.len())?;
            Ok(matches.into_iter().nth(choice).context("choice vanished")?)
        }
    }
}

pub(crate) fn cmd_diary_show(store: &Store, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let entries = store.diary_for(date);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        eprintln!("No diary entries for {date}.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct DiaryRow {
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Food")]
        food: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "kcal")]
        calories: String,
        #[tabled(rename = "P (g)")]
        protein: String,
        #[tabled(rename = "C (g)")]
        carbs: String,
        #[tabled(rename = "F (g)")]
        fat: String,
    }

    let mut rows = Vec::new();
    let (mut cal, mut protein, mut carbs, mut fat) = (0.0, 0.0, 0.0, 0.0);
    for meal in MealType::ALL {
        for entry in entries.iter().filter(|e| e.meal == meal) {
            let q = entry.quantity;
            cal += entry.food.calories * q;
            protein += entry.food.protein_grams * q;
            carbs += entry.food.carb_grams * q;
            fat += entry.food.fat_grams * q;
            rows.push(DiaryRow {
                meal: meal.to_string(),
                id: short_id(&entry.id).to_string(),
                food: truncate(&entry.food.name, 35),
                quantity: format!("{q:.1}"),
                calories: format!("{:.0}", entry.food.calories * q),
                protein: format!("{:.1}", entry.food.protein_grams * q),
                carbs: format!("{:.1}", entry.food.carb_grams * q),
                fat: format!("{:.1}", entry.food.fat_grams * q),
            });
        }
    }

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..8)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("Total: {cal:.0} kcal | P {protein:.1} g | C {carbs:.1} g | F {fat:.1} g");

    if let Some(t) = store.targets() {
        #[allow(clippy::cast_precision_loss)]
        let remaining = t.calories as f64 - cal;
        println!("Target: {} kcal ({remaining:.0} remaining)", t.calories);
    }
    Ok(())
}

pub(crate) struct DiaryEditArgs {
    pub quantity: Option<f64>,
    pub meal: Option<String>,
    pub date: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub json: bool,
}

/// Edit an entry in place. Macro flags change the embedded snapshot only;
/// the library food is untouched.
pub(crate) fn cmd_diary_update(store: &Store, id: &str, args: DiaryEditArgs) -> Result<()> {
    let diary = store.diary();
    let id = resolve_id(diary.iter().map(|d| d.id.as_str()), id)?;
    let mut entry = store
        .find_diary_entry(&id)
        .context("Diary entry not found")?;

    if let Some(quantity) = args.quantity {
        validate_quantity(quantity)?;
        entry.quantity = quantity;
    }
    if let Some(meal) = &args.meal {
        entry.meal = meal.parse()?;
    }
    if args.date.is_some() {
        entry.date = parse_date(args.date)?;
    }
    if let Some(calories) = args.calories {
        entry.food.calories = calories;
    }
    if let Some(protein) = args.protein {
        entry.food.protein_grams = protein;
    }
    if let Some(carbs) = args.carbs {
        entry.food.carb_grams = carbs;
    }
    if let Some(fat) = args.fat {
        entry.food.fat_grams = fat;
    }

    store.update_diary_entry(entry.clone());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("Updated diary entry {}", short_id(&id));
    }
    Ok(())
}

pub(crate) fn cmd_diary_delete(store: &Store, id: &str, json: bool) -> Result<()> {
    let diary = store.diary();
    let id = resolve_id(diary.iter().map(|d| d.id.as_str()), id)?;
    store.remove_diary_entry(&id);

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted diary entry {}", short_id(&id));
    }
    Ok(())
}
