use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::models::{
    CardioEntry, ExerciseEntry, ExerciseSet, FoodItem, SetType, new_id,
};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Parse a compact exercise spec: `Name:SETSxREPS[@KG][*TYPE][!]`.
///
/// Examples: `Bench Press:3x8@80`, `Pull-ups:3x10`, `Curls:2x12@20*dropset`,
/// `Leg Press:1x15@120!` (final `!` marks the sets as taken to failure).
pub(crate) fn parse_exercise(spec: &str) -> Result<ExerciseEntry> {
    let (name, scheme) = spec
        .rsplit_once(':')
        .with_context(|| format!("Invalid exercise '{spec}'. Use 'Name:SETSxREPS[@KG]'"))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("Exercise name must not be empty");
    }

    let mut scheme = scheme.trim();
    let to_failure = scheme.ends_with('!');
    if to_failure {
        scheme = scheme[..scheme.len() - 1].trim_end();
    }

    let (scheme, set_type) = match scheme.split_once('*') {
        Some((rest, type_str)) => (rest, type_str.trim().parse::<SetType>()?),
        None => (scheme, SetType::Normal),
    };

    let (scheme, weight_kg) = match scheme.split_once('@') {
        Some((rest, weight)) => {
            let kg: f64 = weight
                .trim()
                .parse()
                .with_context(|| format!("Invalid weight in '{spec}'"))?;
            if kg <= 0.0 {
                bail!("Set weight must be greater than 0");
            }
            (rest, Some(kg))
        }
        None => (scheme, None),
    };

    let (sets, reps) = scheme
        .split_once(['x', 'X'])
        .with_context(|| format!("Invalid set scheme in '{spec}'. Use SETSxREPS"))?;
    let sets: u32 = sets
        .trim()
        .parse()
        .with_context(|| format!("Invalid set count in '{spec}'"))?;
    let reps: u32 = reps
        .trim()
        .parse()
        .with_context(|| format!("Invalid rep count in '{spec}'"))?;
    if sets == 0 {
        bail!("Set count must be at least 1");
    }

    Ok(ExerciseEntry {
        id: new_id(),
        name: name.to_string(),
        muscle_group: None,
        sets: (0..sets)
            .map(|_| ExerciseSet {
                id: new_id(),
                set_type,
                reps: Some(reps),
                weight_kg,
                to_failure: to_failure.then_some(true),
            })
            .collect(),
    })
}

/// Parse a cardio spec: `Activity:MINUTES[@KCAL]`, e.g. `Running:30@250`.
pub(crate) fn parse_cardio(spec: &str) -> Result<CardioEntry> {
    let (activity, rest) = spec
        .rsplit_once(':')
        .with_context(|| format!("Invalid cardio '{spec}'. Use 'Activity:MINUTES[@KCAL]'"))?;
    let activity = activity.trim();
    if activity.is_empty() {
        bail!("Cardio activity must not be empty");
    }

    let (minutes, calories) = match rest.split_once('@') {
        Some((m, c)) => (
            m,
            Some(
                c.trim()
                    .parse::<f64>()
                    .with_context(|| format!("Invalid calories in '{spec}'"))?,
            ),
        ),
        None => (rest, None),
    };
    let duration_minutes: f64 = minutes
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration in '{spec}'"))?;
    if duration_minutes <= 0.0 {
        bail!("Cardio duration must be greater than 0");
    }

    Ok(CardioEntry {
        id: new_id(),
        activity: activity.to_string(),
        duration_minutes,
        calories_burned: calories,
    })
}

/// Resolve a full id or unique prefix against a set of record ids.
pub(crate) fn resolve_id<'a>(
    ids: impl Iterator<Item = &'a str>,
    needle: &str,
) -> Result<String> {
    let mut matches: Vec<&str> = Vec::new();
    for id in ids {
        if id == needle {
            return Ok(id.to_string());
        }
        if id.starts_with(needle) {
            matches.push(id);
        }
    }
    match matches.len() {
        0 => bail!("No record matches id '{needle}'"),
        1 => Ok(matches[0].to_string()),
        n => bail!("Id prefix '{needle}' is ambiguous ({n} matches)"),
    }
}

pub(crate) fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}

pub(crate) fn prompt_choice(count: usize) -> Result<usize> {
    eprint!("\nSelect a food (1-{count}): ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    let n: usize = line.trim().parse().context("Invalid number")?;
    if n < 1 || n > count {
        bail!("Selection out of range");
    }
    Ok(n - 1)
}

pub(crate) fn print_food_table(foods: &[FoodItem]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Brand")]
        brand: String,
        #[tabled(rename = "Serving")]
        serving: String,
        #[tabled(rename = "kcal")]
        calories: String,
        #[tabled(rename = "P (g)")]
        protein: String,
        #[tabled(rename = "C (g)")]
        carbs: String,
        #[tabled(rename = "F (g)")]
        fat: String,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .enumerate()
        .map(|(i, f)| FoodRow {
            idx: i + 1,
            id: short_id(&f.id).to_string(),
            name: truncate(&f.name, 35),
            brand: f
                .brand
                .as_deref()
                .map(|b| truncate(b, 20))
                .unwrap_or_default(),
            serving: f.serving_size.clone(),
            calories: format!("{:.0}", f.calories),
            protein: format!("{:.1}", f.protein_grams),
            carbs: format!("{:.1}", f.carb_grams),
            fat: format!("{:.1}", f.fat_grams),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(5..9)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
