//! Core library for fitlog: the domain model, the local-first state store
//! with on-device persistence, target derivation, cloud sync reconciliation,
//! recipe generation, the trainer chat session, and CSV export.

pub mod catalog;
pub mod chat;
pub mod db;
pub mod export;
pub mod models;
pub mod recipes;
pub mod store;
pub mod sync;
pub mod targets;
