use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveTime, TimeZone, Utc};
use tabled::{Table, Tabled, settings::Style};

use fitlog_core::catalog;
use fitlog_core::models::NewWorkoutSession;
use fitlog_core::store::Store;

use super::helpers::{parse_cardio, parse_date, parse_exercise, resolve_id, short_id, truncate};

pub(crate) fn cmd_workout_log(
    store: &Store,
    title: Option<String>,
    exercises: &[String],
    cardio: &[String],
    date: Option<String>,
    json: bool,
) -> Result<()> {
    if exercises.is_empty() && cardio.is_empty() {
        bail!("A workout needs at least one --exercise or --cardio entry");
    }

    let exercises = exercises
        .iter()
        .map(|spec| parse_exercise(spec))
        .collect::<Result<Vec<_>>>()?;
    let cardio = cardio
        .iter()
        .map(|spec| parse_cardio(spec))
        .collect::<Result<Vec<_>>>()?;

    // Date flag picks the day; the current wall-clock time stamps it.
    let day = parse_date(date)?;
    let time = Local::now().time();
    let local = Local
        .from_local_datetime(&day.and_time(time))
        .single()
        .or_else(|| {
            Local
                .from_local_datetime(&day.and_time(NaiveTime::MIN))
                .single()
        })
        .context("Could not resolve workout timestamp")?;

    let session = NewWorkoutSession {
        date: local.with_timezone(&Utc),
        title,
        exercises,
        cardio: if cardio.is_empty() { None } else { Some(cardio) },
    };
    let id = store.add_workout(session);

    if json {
        println!("{}", serde_json::json!({ "id": id }));
    } else {
        println!("Logged workout {}", short_id(&id));
    }
    Ok(())
}

pub(crate) fn cmd_workout_list(store: &Store, days: Option<u32>, json: bool) -> Result<()> {
    let mut workouts = store.workouts();
    workouts.sort_by_key(|w| std::cmp::Reverse(w.date));
    if let Some(days) = days {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        workouts.retain(|w| w.date >= cutoff);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&workouts)?);
        return Ok(());
    }
    if workouts.is_empty() {
        eprintln!("No workouts logged yet.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct WorkoutRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Exercises")]
        exercises: usize,
        #[tabled(rename = "Sets")]
        sets: usize,
        #[tabled(rename = "Cardio (min)")]
        cardio: String,
    }

    let rows: Vec<WorkoutRow> = workouts
        .iter()
        .map(|w| WorkoutRow {
            id: short_id(&w.id).to_string(),
            date: w.date.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            title: w.title.as_deref().map(|t| truncate(t, 25)).unwrap_or_default(),
            exercises: w.exercises.len(),
            sets: w.exercises.iter().map(|e| e.sets.len()).sum(),
            cardio: w
                .cardio
                .as_ref()
                .map(|c| format!("{:.0}", c.iter().map(|x| x.duration_minutes).sum::<f64>()))
                .unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_workout_delete(store: &Store, id: &str, json: bool) -> Result<()> {
    let workouts = store.workouts();
    let id = resolve_id(workouts.iter().map(|w| w.id.as_str()), id)?;
    store.remove_workout(&id);

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted workout {}", short_id(&id));
    }
    Ok(())
}

pub(crate) fn cmd_workout_splits(store: &Store, json: bool) -> Result<()> {
    let splits = catalog::workout_splits();
    let selected = store.selected_split();

    if json {
        let values: Vec<serde_json::Value> = splits
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "name": s.name,
                    "selected": selected.as_deref() == Some(s.id),
                    "days": s.days.iter().map(|d| serde_json::json!({
                        "name": d.name,
                        "exercises": d.exercises,
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    for split in splits {
        let marker = if selected.as_deref() == Some(split.id) {
            " (selected)"
        } else {
            ""
        };
        println!("{} [{}]{}", split.name, split.id, marker);
        for day in &split.days {
            println!("  {}: {}", day.name, day.exercises.join(", "));
        }
    }
    println!("Select one with `fitlog workout use-split <id>`.");
    Ok(())
}

pub(crate) fn cmd_workout_use_split(store: &Store, id: &str, json: bool) -> Result<()> {
    let split = catalog::find_split(id)
        .with_context(|| format!("Unknown split '{id}'. See `fitlog workout splits`"))?;
    store.set_selected_split(Some(split.id.to_string()));

    if json {
        println!("{}", serde_json::json!({ "selected": split.id }));
    } else {
        println!("Selected split: {}", split.name);
    }
    Ok(())
}
