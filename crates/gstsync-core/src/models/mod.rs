//! Data models shared by extraction, the writer and the CLI.

pub mod config;
pub mod record;
