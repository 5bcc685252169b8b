//! CLI subcommands that do not start the server

pub mod list;
pub mod render;
