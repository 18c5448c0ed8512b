//! CLI Commands

pub mod audit;
pub mod config;
pub mod patterns;
pub mod run;
