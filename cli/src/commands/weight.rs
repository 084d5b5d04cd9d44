use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::models::validate_weight_kg;
use fitlog_core::store::Store;
use fitlog_core::targets::{LBS_PER_KG, lbs_to_kg};

use super::helpers::{parse_date, resolve_id, short_id};

pub(crate) fn cmd_weight_log(
    store: &Store,
    value: f64,
    unit: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let weight_kg = match unit.to_lowercase().as_str() {
        "kg" => value,
        "lbs" | "lb" => {
            let kg = lbs_to_kg(value);
            eprintln!("Converting {value:.1} lbs -> {kg:.2} kg");
            kg
        }
        _ => bail!("Invalid unit '{unit}'. Use 'kg' or 'lbs'"),
    };
    validate_weight_kg(weight_kg)?;

    let date = parse_date(date)?;
    let id = store.add_weight(date, weight_kg);

    if json {
        println!(
            "{}",
            serde_json::json!({ "id": id, "date": date, "weight_kg": weight_kg })
        );
    } else {
        println!(
            "Logged {:.1} kg ({:.1} lbs) for {}",
            weight_kg,
            weight_kg * LBS_PER_KG,
            date
        );
    }
    Ok(())
}

pub(crate) fn cmd_weight_history(store: &Store, days: Option<u32>, json: bool) -> Result<()> {
    let mut entries = store.weights();
    entries.sort_by_key(|e| e.date);
    if let Some(days) = days {
        let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(i64::from(days));
        entries.retain(|e| e.date >= cutoff);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        eprintln!("No weight entries found. Use `fitlog weight log` to record your weight.");
    } else {
        #[derive(Tabled)]
        struct WeightRow {
            #[tabled(rename = "ID")]
            id: String,
            #[tabled(rename = "Date")]
            date: String,
            #[tabled(rename = "Weight (kg)")]
            kg: String,
            #[tabled(rename = "Weight (lbs)")]
            lbs: String,
        }

        let rows: Vec<WeightRow> = entries
            .iter()
            .map(|e| WeightRow {
                id: short_id(&e.id).to_string(),
                date: e.date.format("%Y-%m-%d").to_string(),
                kg: format!("{:.1}", e.weight_kg),
                lbs: format!("{:.1}", e.weight_kg * LBS_PER_KG),
            })
            .collect();

        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }
    Ok(())
}

pub(crate) fn cmd_weight_delete(store: &Store, id: &str, json: bool) -> Result<()> {
    let weights = store.weights();
    let id = resolve_id(weights.iter().map(|w| w.id.as_str()), id)?;
    store.remove_weight(&id);

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted weight entry {}", short_id(&id));
    }
    Ok(())
}
