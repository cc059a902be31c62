//! lapsync - align F1 race laps with timestamped community reactions
//!
//! The core is the lap-interval binner in [`binning`], which assigns every
//! timestamped event (forum post, live comment, logged incident) to the lap
//! it happened in. The other modules prepare its inputs (timestamp
//! normalization, lap tables from telemetry) and aggregate its outputs
//! (per-lap counts, comment activity, toxicity windows, emotion shares).

pub mod activity;
pub mod binning;
pub mod cli;
pub mod commands;
pub mod config;
pub mod csv_output;
pub mod emotion;
pub mod error;
pub mod events;
pub mod json_output;
pub mod lap_key;
pub mod laps;
pub mod table;
pub mod text;
pub mod timestamp;
pub mod toxicity;

pub use error::{Error, Result};
