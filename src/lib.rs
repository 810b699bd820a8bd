//! opsboard: spreadsheet extraction and dashboard view-models for the KTLO
//! task tracker and the Aurora PostgreSQL inventory.
//!
//! Pipeline: `processor` reads a workbook into typed records, `json_loader`
//! persists them, and `services` derives each dashboard's view-model from
//! (records, filter, now) using the rules in `classify`.

pub mod classify;
pub mod config;
pub mod error;
pub mod json_loader;
pub mod processor;
pub mod services;
pub mod types;
pub mod util;
