//! ReShade installer for Wine and Proton games on Linux.
//!
//! The overlay is installed by linking a fixed set of files into a game's
//! directory. The crate is organised leaf-first:
//!
//! - **[`classifier`]** reads a PE header to pick architecture, graphics API
//!   and override module
//! - **[`resources`]** creates and removes single symlinks safely
//! - **[`shaders`]** merges shader repositories into one namespace
//! - **[`config`]** holds settings, the main path layout and the target store
//! - **[`install`]** runs install and uninstall transactions for one target
//! - **[`sources`]** downloads releases and syncs shader repositories
//! - **[`commands`]** wires the above to the CLI subcommands
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod install;
pub mod logging;
pub mod resources;
pub mod shaders;
pub mod sources;
pub mod target;
