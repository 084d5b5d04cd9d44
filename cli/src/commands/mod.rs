mod account;
mod diary;
mod export;
mod food;
mod helpers;
mod kitchen;
mod profile;
mod sync;
mod target;
mod trainer;
mod weight;
mod workout;

pub(crate) use account::{cmd_login, cmd_logout, cmd_signup, cmd_whoami};
pub(crate) use diary::{DiaryEditArgs, cmd_diary_delete, cmd_diary_show, cmd_diary_update, cmd_log};
pub(crate) use export::cmd_export;
pub(crate) use food::{
    FoodFields, FoodTarget, cmd_food_add, cmd_food_list, cmd_food_remove, cmd_food_suggestions,
};
pub(crate) use kitchen::{
    cmd_cookbook_list, cmd_cookbook_log, cmd_cookbook_remove, cmd_kitchen_generate,
};
pub(crate) use profile::{ProfileSetArgs, cmd_profile_set, cmd_profile_show};
pub(crate) use sync::{cmd_sync_configure, cmd_sync_now, cmd_sync_status, cmd_sync_watch};
pub(crate) use target::{cmd_targets_set, cmd_targets_show};
pub(crate) use trainer::cmd_trainer;
pub(crate) use weight::{cmd_weight_delete, cmd_weight_history, cmd_weight_log};
pub(crate) use workout::{
    cmd_workout_delete, cmd_workout_list, cmd_workout_log, cmd_workout_splits,
    cmd_workout_use_split,
};
