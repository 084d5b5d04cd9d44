mod coach;
mod commands;
mod config;
mod remote;
mod server;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use fitlog_core::db::DocumentDb;
use fitlog_core::store::Store;

use crate::commands::{
    DiaryEditArgs, FoodFields, FoodTarget, ProfileSetArgs, cmd_cookbook_list, cmd_cookbook_log,
    cmd_cookbook_remove, cmd_diary_delete, cmd_diary_show, cmd_diary_update, cmd_export,
    cmd_food_add, cmd_food_list, cmd_food_remove, cmd_food_suggestions, cmd_kitchen_generate,
    cmd_log, cmd_login, cmd_logout, cmd_profile_set, cmd_profile_show, cmd_signup,
    cmd_sync_configure, cmd_sync_now, cmd_sync_status, cmd_sync_watch, cmd_targets_set,
    cmd_targets_show, cmd_trainer, cmd_weight_delete, cmd_weight_history, cmd_weight_log,
    cmd_whoami, cmd_workout_delete, cmd_workout_list, cmd_workout_log, cmd_workout_splits,
    cmd_workout_use_split,
};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "fitlog",
    version,
    about = "A local-first fitness and nutrition tracker with cloud sync",
    long_about = "\n\n  ███████╗██╗████████╗██╗      ██████╗  ██████╗
  ██╔════╝██║╚══██╔══╝██║     ██╔═══██╗██╔════╝
  █████╗  ██║   ██║   ██║     ██║   ██║██║  ███╗
  ██╔══╝  ██║   ██║   ██║     ██║   ██║██║   ██║
  ██║     ██║   ██║   ███████╗╚██████╔╝╚██████╔╝
  ╚═╝     ╚═╝   ╚═╝   ╚══════╝ ╚═════╝  ╚═════╝
          eat well. lift well. log it.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FoodFlags {
    /// Food name
    #[arg(long)]
    name: Option<String>,
    /// Brand name
    #[arg(long)]
    brand: Option<String>,
    /// Serving label, e.g. "100 g" or "1 scoop (30 g)"
    #[arg(long, default_value = "100 g")]
    serving: String,
    /// Calories per serving
    #[arg(long)]
    calories: Option<f64>,
    /// Protein grams per serving
    #[arg(long, default_value = "0")]
    protein: f64,
    /// Carb grams per serving
    #[arg(long, default_value = "0")]
    carbs: f64,
    /// Fat grams per serving
    #[arg(long, default_value = "0")]
    fat: f64,
    /// Sugars grams per serving
    #[arg(long)]
    sugars: Option<f64>,
    /// Fiber grams per serving
    #[arg(long)]
    fiber: Option<f64>,
    /// Sodium mg per serving
    #[arg(long)]
    sodium: Option<f64>,
    /// Saturated fat grams per serving
    #[arg(long)]
    saturated_fat: Option<f64>,
    /// Trans fat grams per serving
    #[arg(long)]
    trans_fat: Option<f64>,
    /// Cholesterol mg per serving
    #[arg(long)]
    cholesterol: Option<f64>,
    /// Copy a built-in suggestion by name instead of spelling out fields
    #[arg(long)]
    suggestion: Option<String>,
}

impl From<FoodFlags> for FoodFields {
    fn from(flags: FoodFlags) -> Self {
        FoodFields {
            name: flags.name,
            brand: flags.brand,
            serving: flags.serving,
            calories: flags.calories,
            protein: flags.protein,
            carbs: flags.carbs,
            fat: flags.fat,
            sugars: flags.sugars,
            fiber: flags.fiber,
            sodium: flags.sodium,
            saturated_fat: flags.saturated_fat,
            trans_fat: flags.trans_fat,
            cholesterol: flags.cholesterol,
            suggestion: flags.suggestion,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Manage your profile (saving it re-derives macro targets)
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Show or override daily calorie/macro targets
    Targets {
        #[command(subcommand)]
        command: TargetCommands,
    },
    /// Track body weight
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },
    /// Manage the foods library
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Manage pantry ingredients for recipe generation
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Log a food from the library to the diary
    Log {
        /// Food id (or prefix) or name to search for
        food: String,
        /// Meal slot: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: String,
        /// Serving multiplier
        #[arg(short, long, default_value = "1")]
        quantity: f64,
        /// Date to log for (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect and edit the meal diary
    Diary {
        #[command(subcommand)]
        command: DiaryCommands,
    },
    /// Track workouts
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },
    /// Generate recipe ideas from your pantry
    Kitchen {
        #[command(subcommand)]
        command: KitchenCommands,
    },
    /// Saved recipes
    Cookbook {
        #[command(subcommand)]
        command: CookbookCommands,
    },
    /// Chat with your personal trainer
    Trainer {
        /// One-shot question; omit for an interactive session
        message: Option<String>,
    },
    /// Export collections as CSV
    Export {
        /// What to export: diary, workouts, weights
        what: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Sync account management
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Cloud sync operations
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Run the sync backend server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Create or update the profile; omitted flags keep their saved values
    Set {
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Unit system for input and display: metric or imperial
        #[arg(long)]
        unit: Option<String>,
        /// Height (cm, or inches with --unit imperial)
        #[arg(long)]
        height: Option<f64>,
        /// Weight (kg, or lbs with --unit imperial)
        #[arg(long)]
        weight: Option<f64>,
        /// Age in years
        #[arg(long)]
        age: Option<u32>,
        /// Gender: male, female, other
        #[arg(long)]
        gender: Option<String>,
        /// Activity level: sedentary, light, moderate, active, very_active
        #[arg(long)]
        activity: Option<String>,
        /// Goal: cut, maintain, bulk
        #[arg(long)]
        goal: Option<String>,
        /// Goal weight (same unit as --weight)
        #[arg(long)]
        goal_weight: Option<f64>,
        /// Cardio sessions per week
        #[arg(long)]
        cardio_days: Option<u32>,
        /// Resistance training sessions per week
        #[arg(long)]
        training_days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the profile and current targets
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TargetCommands {
    /// Override targets manually (stands until the next profile save)
    Set {
        /// Daily calories
        calories: i64,
        /// Protein grams
        #[arg(long)]
        protein: i64,
        /// Carb grams
        #[arg(long)]
        carbs: i64,
        /// Fat grams
        #[arg(long)]
        fat: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current targets
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Log a weight entry
    Log {
        /// Weight value
        value: f64,
        /// Unit: kg or lbs (default: kg)
        #[arg(short, long, default_value = "kg")]
        unit: String,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight history
    History {
        /// Only show the last N days
        #[arg(short, long)]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a weight entry by id (or prefix)
    Delete {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a food to the library
    Add {
        #[command(flatten)]
        fields: FoodFlags,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List or search the library
    List {
        /// Filter by name or brand
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a food by id (or prefix)
    Remove {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Browse the built-in suggestion list
    Suggestions {
        /// Filter by name
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PantryCommands {
    /// Add an ingredient to the pantry
    Add {
        #[command(flatten)]
        fields: FoodFlags,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List pantry ingredients
    List {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient by id (or prefix)
    Remove {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DiaryCommands {
    /// Show the diary for a day (default: today)
    Show {
        /// Date (YYYY-MM-DD or today/yesterday)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an entry; macro flags change the embedded snapshot only
    Edit {
        id: String,
        /// New serving multiplier
        #[arg(short, long)]
        quantity: Option<f64>,
        /// New meal slot
        #[arg(short, long)]
        meal: Option<String>,
        /// New date
        #[arg(long)]
        date: Option<String>,
        /// Override snapshot calories
        #[arg(long)]
        calories: Option<f64>,
        /// Override snapshot protein grams
        #[arg(long)]
        protein: Option<f64>,
        /// Override snapshot carb grams
        #[arg(long)]
        carbs: Option<f64>,
        /// Override snapshot fat grams
        #[arg(long)]
        fat: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry by id (or prefix)
    Delete {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WorkoutCommands {
    /// Log a workout session
    Log {
        /// Session title, e.g. "Push Day"
        #[arg(short, long)]
        title: Option<String>,
        /// Exercise spec 'Name:SETSxREPS[@KG][*TYPE][!]' (repeatable)
        #[arg(short, long = "exercise")]
        exercises: Vec<String>,
        /// Cardio spec 'Activity:MINUTES[@KCAL]' (repeatable)
        #[arg(short, long = "cardio")]
        cardio: Vec<String>,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List workouts
    List {
        /// Only show the last N days
        #[arg(short, long)]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a workout by id (or prefix)
    Delete {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the built-in split presets
    Splits {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Select a split preset
    UseSplit {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum KitchenCommands {
    /// Generate 3-5 recipe variations from pantry ingredients
    Generate {
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "dinner")]
        meal: String,
        /// Save variation N to the cookbook instead of just printing
        #[arg(long)]
        save: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CookbookCommands {
    /// List saved recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a recipe by id (or prefix)
    Remove {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a recipe to the diary as a single food
    Log {
        id: String,
        /// Date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Create an account on the sync backend and sign in
    Signup {
        email: String,
        /// Password (falls back to FITLOG_PASSWORD, then a prompt)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in to the sync backend
    Login {
        email: String,
        /// Password (falls back to FITLOG_PASSWORD, then a prompt)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign out
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the signed-in account
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SyncCommands {
    /// Set the sync backend URL
    Configure {
        /// Backend base URL, e.g. http://localhost:8080
        #[arg(long)]
        url: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show sync configuration and local collection sizes
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Hydrate from remote, then push the local snapshot once
    Now,
    /// Keep syncing live until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let store = Store::open(&config.state_db_path)?;

    match cli.command {
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            // The server side only touches the document db.
            let db = DocumentDb::open(&config.server_db_path)?;
            server::start_server(db, port, &bind, api_key, new_api_key).await
        }
        Commands::Profile { command } => match command {
            ProfileCommands::Set {
                name,
                unit,
                height,
                weight,
                age,
                gender,
                activity,
                goal,
                goal_weight,
                cardio_days,
                training_days,
                json,
            } => cmd_profile_set(
                &store,
                ProfileSetArgs {
                    name,
                    unit,
                    height,
                    weight,
                    age,
                    gender,
                    activity,
                    goal,
                    goal_weight,
                    cardio_days,
                    training_days,
                    json,
                },
            ),
            ProfileCommands::Show { json } => cmd_profile_show(&store, json),
        },
        Commands::Targets { command } => match command {
            TargetCommands::Set {
                calories,
                protein,
                carbs,
                fat,
                json,
            } => cmd_targets_set(&store, calories, protein, carbs, fat, json),
            TargetCommands::Show { json } => cmd_targets_show(&store, json),
        },
        Commands::Weight { command } => match command {
            WeightCommands::Log {
                value,
                unit,
                date,
                json,
            } => cmd_weight_log(&store, value, &unit, date, json),
            WeightCommands::History { days, json } => cmd_weight_history(&store, days, json),
            WeightCommands::Delete { id, json } => cmd_weight_delete(&store, &id, json),
        },
        Commands::Food { command } => match command {
            FoodCommands::Add { fields, json } => {
                cmd_food_add(&store, FoodTarget::Library, fields.into(), json)
            }
            FoodCommands::List { search, json } => {
                cmd_food_list(&store, FoodTarget::Library, search.as_deref(), json)
            }
            FoodCommands::Remove { id, json } => {
                cmd_food_remove(&store, FoodTarget::Library, &id, json)
            }
            FoodCommands::Suggestions { search, json } => {
                cmd_food_suggestions(search.as_deref(), json)
            }
        },
        Commands::Pantry { command } => match command {
            PantryCommands::Add { fields, json } => {
                cmd_food_add(&store, FoodTarget::Pantry, fields.into(), json)
            }
            PantryCommands::List { search, json } => {
                cmd_food_list(&store, FoodTarget::Pantry, search.as_deref(), json)
            }
            PantryCommands::Remove { id, json } => {
                cmd_food_remove(&store, FoodTarget::Pantry, &id, json)
            }
        },
        Commands::Log {
            food,
            meal,
            quantity,
            date,
            json,
        } => cmd_log(&store, &food, &meal, quantity, date, json),
        Commands::Diary { command } => match command {
            DiaryCommands::Show { date, json } => cmd_diary_show(&store, date, json),
            DiaryCommands::Edit {
                id,
                quantity,
                meal,
                date,
                calories,
                protein,
                carbs,
                fat,
                json,
            } => cmd_diary_update(
                &store,
                &id,
                DiaryEditArgs {
                    quantity,
                    meal,
                    date,
                    calories,
                    protein,
                    carbs,
                    fat,
                    json,
                },
            ),
            DiaryCommands::Delete { id, json } => cmd_diary_delete(&store, &id, json),
        },
        Commands::Workout { command } => match command {
            WorkoutCommands::Log {
                title,
                exercises,
                cardio,
                date,
                json,
            } => cmd_workout_log(&store, title, &exercises, &cardio, date, json),
            WorkoutCommands::List { days, json } => cmd_workout_list(&store, days, json),
            WorkoutCommands::Delete { id, json } => cmd_workout_delete(&store, &id, json),
            WorkoutCommands::Splits { json } => cmd_workout_splits(&store, json),
            WorkoutCommands::UseSplit { id, json } => cmd_workout_use_split(&store, &id, json),
        },
        Commands::Kitchen { command } => match command {
            KitchenCommands::Generate { meal, save, json } => {
                cmd_kitchen_generate(&store, &meal, save, json)
            }
        },
        Commands::Cookbook { command } => match command {
            CookbookCommands::List { json } => cmd_cookbook_list(&store, json),
            CookbookCommands::Remove { id, json } => cmd_cookbook_remove(&store, &id, json),
            CookbookCommands::Log { id, date, json } => cmd_cookbook_log(&store, &id, date, json),
        },
        Commands::Trainer { message } => cmd_trainer(&config, message).await,
        Commands::Export { what, out } => cmd_export(&store, &what, out),
        Commands::Account { command } => match command {
            AccountCommands::Signup {
                email,
                password,
                json,
            } => cmd_signup(&config, &email, password, json).await,
            AccountCommands::Login {
                email,
                password,
                json,
            } => cmd_login(&config, &email, password, json).await,
            AccountCommands::Logout { json } => cmd_logout(&config, json),
            AccountCommands::Whoami { json } => cmd_whoami(&config, json),
        },
        Commands::Sync { command } => match command {
            SyncCommands::Configure { url, json } => cmd_sync_configure(&config, &url, json),
            SyncCommands::Status { json } => cmd_sync_status(&config, &store, json),
            SyncCommands::Now => cmd_sync_now(&config, &store).await,
            SyncCommands::Watch => cmd_sync_watch(&config, &store).await,
        },
    }
}
