//! CLI Commands

pub mod app;
pub mod deploy;
pub mod fetch;
