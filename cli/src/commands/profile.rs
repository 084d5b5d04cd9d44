use anyhow::{Context, Result};
use chrono::Local;

use fitlog_core::models::{MacroTargets, NewProfile, UnitSystem, UserProfile};
use fitlog_core::store::Store;
use fitlog_core::targets::{cm_to_inches, kg_to_lbs};

pub(crate) struct ProfileSetArgs {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub activity: Option<String>,
    pub goal: Option<String>,
    pub goal_weight: Option<f64>,
    pub cardio_days: Option<u32>,
    pub training_days: Option<u32>,
    pub json: bool,
}

pub(crate) fn cmd_profile_set(store: &Store, args: ProfileSetArgs) -> Result<()> {
    let existing = store.profile();

    let unit: UnitSystem = match &args.unit {
        Some(u) => u.parse()?,
        None => existing.as_ref().map(|p| p.unit_system).unwrap_or_default(),
    };

    // Flags override; anything omitted falls back to the saved profile,
    // with height/weight presented in the active unit system.
    let height = args
        .height
        .or_else(|| {
            existing.as_ref().map(|p| match unit {
                UnitSystem::Metric => p.height_cm,
                UnitSystem::Imperial => cm_to_inches(p.height_cm),
            })
        })
        .context("--height is required (cm, or inches with --unit imperial)")?;
    let weight = args
        .weight
        .or_else(|| {
            existing.as_ref().map(|p| match unit {
                UnitSystem::Metric => p.weight_kg,
                UnitSystem::Imperial => kg_to_lbs(p.weight_kg),
            })
        })
        .context("--weight is required (kg, or lbs with --unit imperial)")?;
    let age = args
        .age
        .or(existing.as_ref().map(|p| p.age))
        .context("--age is required")?;
    let gender = match &args.gender {
        Some(g) => g.parse()?,
        None => existing
            .as_ref()
            .map(|p| p.gender)
            .context("--gender is required (male, female, other)")?,
    };
    let activity_level = match &args.activity {
        Some(a) => a.parse()?,
        None => existing
            .as_ref()
            .map(|p| p.activity_level)
            .context("--activity is required (sedentary, light, moderate, active, very_active)")?,
    };
    let goal = match &args.goal {
        Some(g) => g.parse()?,
        None => existing
            .as_ref()
            .map(|p| p.goal)
            .context("--goal is required (cut, maintain, bulk)")?,
    };

    let form = NewProfile {
        name: args.name.or_else(|| existing.as_ref().and_then(|p| p.name.clone())),
        unit_system: unit,
        height,
        weight,
        age,
        gender,
        activity_level,
        goal,
        goal_weight: args.goal_weight.or_else(|| {
            existing.as_ref().and_then(|p| {
                p.goal_weight_kg.map(|kg| match unit {
                    UnitSystem::Metric => kg,
                    UnitSystem::Imperial => kg_to_lbs(kg),
                })
            })
        }),
        cardio_days_per_week: args
            .cardio_days
            .or_else(|| existing.as_ref().and_then(|p| p.cardio_days_per_week)),
        training_days_per_week: args
            .training_days
            .or_else(|| existing.as_ref().and_then(|p| p.training_days_per_week)),
    };

    let normalized = form.clone().into_metric();

    // Auto-log today's weight when the profile weight moved and there is no
    // entry for today yet.
    if let Some(old) = &existing {
        if (old.weight_kg - normalized.weight_kg).abs() > 0.01 {
            let today = Local::now().date_naive();
            if !store.has_weight_for(today) {
                store.add_weight(today, normalized.weight_kg);
                eprintln!(
                    "Logged {:.1} kg for {} from the profile change",
                    normalized.weight_kg, today
                );
            }
        }
    }

    let profile = store.save_profile(form);
    let targets = store
        .targets()
        .context("targets missing after profile save")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "profile": profile,
                "targets": targets,
            }))?
        );
    } else {
        println!("Profile saved.");
        print_profile(&profile, Some(&targets));
    }

    Ok(())
}

pub(crate) fn cmd_profile_show(store: &Store, json: bool) -> Result<()> {
    match store.profile() {
        Some(profile) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "profile": profile,
                        "targets": store.targets(),
                    }))?
                );
            } else {
                print_profile(&profile, store.targets().as_ref());
            }
        }
        None => {
            if json {
                println!("null");
            } else {
                eprintln!("No profile yet. Create one with `fitlog profile set`.");
            }
        }
    }
    Ok(())
}

fn print_profile(profile: &UserProfile, targets: Option<&MacroTargets>) {
    if let Some(name) = &profile.name {
        println!("  Name:      {name}");
    }
    match profile.unit_system {
        UnitSystem::Metric => {
            println!("  Height:    {:.0} cm", profile.height_cm);
            println!("  Weight:    {:.1} kg", profile.weight_kg);
        }
        UnitSystem::Imperial => {
            println!(
                "  Height:    {:.1} in ({:.0} cm)",
                cm_to_inches(profile.height_cm),
                profile.height_cm
            );
            println!(
                "  Weight:    {:.1} lbs ({:.1} kg)",
                kg_to_lbs(profile.weight_kg),
                profile.weight_kg
            );
        }
    }
    println!("  Age:       {}", profile.age);
    println!("  Gender:    {:?}", profile.gender);
    println!("  Activity:  {:?}", profile.activity_level);
    println!("  Goal:      {:?}", profile.goal);
    if let Some(goal_weight) = profile.goal_weight_kg {
        println!("  Goal weight: {goal_weight:.1} kg");
    }
    if let Some(days) = profile.cardio_days_per_week {
        println!("  Cardio:    {days}x/week");
    }
    if let Some(days) = profile.training_days_per_week {
        println!("  Training:  {days}x/week");
    }
    if let Some(t) = targets {
        println!(
            "  Targets:   {} kcal | P {} g | C {} g | F {} g",
            t.calories, t.protein_grams, t.carb_grams, t.fat_grams
        );
    }
}
