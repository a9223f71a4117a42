//! Command-line front end for the GTFS feed validator.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod report;
pub mod summary;
