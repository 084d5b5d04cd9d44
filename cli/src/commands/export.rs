use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use fitlog_core::export;
use fitlog_core::store::Store;

pub(crate) fn cmd_export(store: &Store, what: &str, out: Option<PathBuf>) -> Result<()> {
    let csv = match what.to_lowercase().as_str() {
        "diary" | "macros" => export::diary_csv(&store.diary())?,
        "workouts" => export::workouts_csv(&store.workouts())?,
        "weights" | "weight" => export::weights_csv(&store.weights())?,
        _ => bail!("Unknown export '{what}'. Must be one of: diary, workouts, weights"),
    };

    match out {
        Some(path) => {
            std::fs::write(&path, csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}
