//! CLI command handlers

pub mod commands;

pub use commands::{
    composition, drill_from_args, facts, options, selection_from_args, series, show, years,
    TotalKind,
};
