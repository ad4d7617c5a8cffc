pub mod cluster;
pub mod commands;
pub mod config;
pub mod output;
pub mod suppress;
pub mod telemetry;
