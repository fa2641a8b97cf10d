//! HTTP routes

pub mod commands;
pub mod status;
