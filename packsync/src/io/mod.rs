//! I/O collaborators for packsync commands.

pub mod config;
pub mod installer;
pub mod modrinth;
pub mod mods_dir;
pub mod process;
