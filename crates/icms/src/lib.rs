//! Case-management core for import licence and export certificate applications.

pub mod case;
pub mod chief;
pub mod config;
pub mod error;
pub mod flow;
pub mod search;
pub mod telemetry;
