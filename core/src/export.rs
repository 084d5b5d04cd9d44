//! One-shot CSV exports of the diary, workout, and weight collections.
//! Pure text generation; callers decide where the bytes go.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::models::{DiaryEntry, WeightEntry, WorkoutSession};

const DIARY_HEADER: [&str; 8] = [
    "Date",
    "Meal",
    "Food",
    "Quantity",
    "Calories",
    "Protein_g",
    "Carbs_g",
    "Fats_g",
];

const WORKOUT_HEADER: [&str; 12] = [
    "Date",
    "Time",
    "Title",
    "Exercise",
    "Type",
    "Sets",
    "Reps",
    "Weight_kg",
    "To_Failure",
    "Cardio_Type",
    "Cardio_Duration_min",
    "Cardio_Calories",
];

/// Diary entries grouped by day, each day led by a TOTAL row and separated
/// by a blank row.
pub fn diary_csv(diary: &[DiaryEntry]) -> Result<String> {
    let mut by_date: BTreeMap<String, Vec<&DiaryEntry>> = BTreeMap::new();
    for entry in diary {
        by_date
            .entry(entry.date.format("%Y-%m-%d").to_string())
            .or_default()
            .push(entry);
    }

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(DIARY_HEADER)?;

    for (date, entries) in by_date {
        let (cal, protein, carbs, fats) = entries.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, e| {
            (
                acc.0 + e.food.calories * e.quantity,
                acc.1 + e.food.protein_grams * e.quantity,
                acc.2 + e.food.carb_grams * e.quantity,
                acc.3 + e.food.fat_grams * e.quantity,
            )
        });

        wtr.write_record([
            date.clone(),
            "TOTAL".to_string(),
            String::new(),
            String::new(),
            format!("{cal:.1}"),
            format!("{protein:.1}"),
            format!("{carbs:.1}"),
            format!("{fats:.1}"),
        ])?;

        for entry in entries {
            wtr.write_record([
                date.clone(),
                entry.meal.to_string(),
                entry.food.name.clone(),
                entry.quantity.to_string(),
                format!("{:.1}", entry.food.calories * entry.quantity),
                format!("{:.1}", entry.food.protein_grams * entry.quantity),
                format!("{:.1}", entry.food.carb_grams * entry.quantity),
                format!("{:.1}", entry.food.fat_grams * entry.quantity),
            ])?;
        }

        wtr.write_record([""; 8])?;
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

/// Workouts flattened to one row per set and per cardio entry, sorted by
/// session date.
pub fn workouts_csv(workouts: &[WorkoutSession]) -> Result<String> {
    let mut sorted: Vec<&WorkoutSession> = workouts.iter().collect();
    sorted.sort_by_key(|w| w.date);

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(WORKOUT_HEADER)?;

    for workout in sorted {
        let date = workout.date.format("%Y-%m-%d").to_string();
        let time = workout.date.format("%H:%M").to_string();
        let title = workout.title.clone().unwrap_or_default();

        let blank = String::new();
        wtr.write_record([
            date.clone(),
            time.clone(),
            title.clone(),
            blank.clone(),
            blank.clone(),
            blank.clone(),
            blank.clone(),
            blank.clone(),
            blank.clone(),
            blank.clone(),
            blank.clone(),
            blank.clone(),
        ])?;

        for exercise in &workout.exercises {
            for (idx, set) in exercise.sets.iter().enumerate() {
                wtr.write_record([
                    date.clone(),
                    time.clone(),
                    title.clone(),
                    if idx == 0 {
                        exercise.name.clone()
                    } else {
                        String::new()
                    },
                    set.set_type.as_str().to_string(),
                    (idx + 1).to_string(),
                    set.reps.map(|r| r.to_string()).unwrap_or_default(),
                    set.weight_kg.map(|w| w.to_string()).unwrap_or_default(),
                    if set.to_failure == Some(true) { "Yes" } else { "No" }.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                ])?;
            }
        }

        for cardio in workout.cardio.iter().flatten() {
            wtr.write_record([
                date.clone(),
                time.clone(),
                title.clone(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                cardio.activity.clone(),
                cardio.duration_minutes.to_string(),
                cardio
                    .calories_burned
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
            ])?;
        }

        wtr.write_record([""; 12])?;
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

/// Weight history sorted by date.
pub fn weights_csv(weights: &[WeightEntry]) -> Result<String> {
    let mut sorted: Vec<&WeightEntry> = weights.iter().collect();
    sorted.sort_by_key(|w| w.date);

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["Date", "Weight_kg"])?;
    for entry in sorted {
        wtr.write_record([
            entry.date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", entry.weight_kg),
        ])?;
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CardioEntry, ExerciseEntry, ExerciseSet, FoodItem, MealType, NewFoodItem, SetType, new_id,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

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

    fn entry(date: (i32, u32, u32), meal: MealType, f: FoodItem, quantity: f64) -> DiaryEntry {
        DiaryEntry {
            id: new_id(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            meal,
            food: f,
            quantity,
        }
    }

    #[test]
    fn test_diary_csv_groups_by_date_with_totals() {
        let diary = vec![
            entry(
                (2024, 6, 16),
                MealType::Breakfast,
                food("Oats", 150.0, 5.0, 27.0, 3.0),
                1.0,
            ),
            entry(
                (2024, 6, 15),
                MealType::Lunch,
                food("Chicken", 165.0, 31.0, 0.0, 3.6),
                2.0,
            ),
            entry(
                (2024, 6, 15),
                MealType::Dinner,
                food("Rice", 130.0, 2.4, 28.0, 0.3),
                1.0,
            ),
        ];

        let csv = diary_csv(&diary).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Date,Meal,Food,Quantity,Calories,Protein_g,Carbs_g,Fats_g"
        );
        // Dates ascending; TOTAL row leads each group.
        assert!(lines[1].starts_with("2024-06-15,TOTAL,,,460.0,64.4,28.0,7.5"));
        assert!(lines[2].starts_with("2024-06-15,lunch,Chicken,2,330.0,62.0,0.0,7.2"));
        assert!(lines[3].starts_with("2024-06-15,dinner,Rice,1,130.0,2.4,28.0,0.3"));
        assert_eq!(lines[4], ",,,,,,,");
        assert!(lines[5].starts_with("2024-06-16,TOTAL"));
    }

    #[test]
    fn test_workouts_csv_flattens_sets_and_cardio() {
        let workout = WorkoutSession {
            id: new_id(),
            date: Utc.with_ymd_and_hms(2024, 6, 15, 7, 30, 0).unwrap(),
            title: Some("Push Day".to_string()),
            exercises: vec![ExerciseEntry {
                id: new_id(),
                name: "Bench Press".to_string(),
                muscle_group: Some("chest".to_string()),
                sets: vec![
                    ExerciseSet {
                        id: new_id(),
                        set_type: SetType::Normal,
                        reps: Some(8),
                        weight_kg: Some(80.0),
                        to_failure: None,
                    },
                    ExerciseSet {
                        id: new_id(),
                        set_type: SetType::Amrap,
                        reps: Some(12),
                        weight_kg: Some(60.0),
                        to_failure: Some(true),
                    },
                ],
            }],
            cardio: Some(vec![CardioEntry {
                id: new_id(),
                activity: "Running".to_string(),
                duration_minutes: 20.0,
                calories_burned: Some(250.0),
            }]),
        };

        let csv = workouts_csv(&[workout]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert!(lines[1].starts_with("2024-06-15,07:30,Push Day,,,"));
        assert!(lines[2].contains("Bench Press,normal,1,8,80,No"));
        // Exercise name only appears on the first set row.
        assert!(lines[3].contains(",amrap,2,12,60,Yes"));
        assert!(!lines[3].contains("Bench Press"));
        assert!(lines[4].contains("Running,20,250"));
    }

    #[test]
    fn test_weights_csv_sorted_by_date() {
        let weights = vec![
            WeightEntry {
                id: new_id(),
                date: NaiveDate::from_ymd_opt(2024, 6, 16).unwrap(),
                weight_kg: 79.6,
            },
            WeightEntry {
                id: new_id(),
                date: NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
                weight_kg: 80.0,
            },
        ];

        let csv = weights_csv(&weights).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Date,Weight_kg");
        assert_eq!(lines[1], "2024-06-14,80.00");
        assert_eq!(lines[2], "2024-06-16,79.60");
    }

    #[test]
    fn test_empty_collections_export_headers_only() {
        assert_eq!(diary_csv(&[]).unwrap().lines().count(), 1);
        assert_eq!(workouts_csv(&[]).unwrap().lines().count(), 1);
        assert_eq!(weights_csv(&[]).unwrap().lines().count(), 1);
    }
}
