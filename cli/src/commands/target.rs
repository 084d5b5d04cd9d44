use anyhow::{Result, bail};

use fitlog_core::models::MacroTargets;
use fitlog_core::store::Store;
use fitlog_core::targets::derive_targets;

pub(crate) fn cmd_targets_set(
    store: &Store,
    calories: i64,
    protein: i64,
    carbs: i64,
    fat: i64,
    json: bool,
) -> Result<()> {
    if calories <= 0 {
        bail!("Calories must be greater than 0");
    }
    if protein < 0 || carbs < 0 || fat < 0 {
        bail!("Macro grams must not be negative");
    }

    let targets = MacroTargets {
        calories,
        protein_grams: protein,
        carb_grams: carbs,
        fat_grams: fat,
    };
    store.set_targets(targets);

    if json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
    } else {
        println!(
            "Targets set: {calories} kcal | P {protein} g | C {carbs} g | F {fat} g \
             (manual override; the next profile save re-derives them)"
        );
    }
    Ok(())
}

pub(crate) fn cmd_targets_show(store: &Store, json: bool) -> Result<()> {
    let targets = store.targets();

    if json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
        return Ok(());
    }

    match targets {
        Some(t) => {
            println!(
                "Daily targets: {} kcal | P {} g | C {} g | F {} g",
                t.calories, t.protein_grams, t.carb_grams, t.fat_grams
            );
            if let Some(profile) = store.profile() {
                let derived = derive_targets(&profile);
                if derived != t {
                    println!(
                        "(manually overridden; derived from profile would be {} kcal)",
                        derived.calories
                    );
                }
            }
        }
        None => eprintln!("No targets yet. Save a profile to derive them, or set them directly."),
    }
    Ok(())
}
