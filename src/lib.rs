//! Browser-driven installer for a Fusio deployment.
//!
//! The server side resolves a step name to a handler in [`steps`]; the
//! client side walks the step order in [`sequencer`]. Both speak the types of
//! `webinstall-common`.

pub mod accessor;
pub mod command;
pub mod config_store;
pub mod database;
pub mod errors;
pub mod installer_config;
pub mod logging;
pub mod overlay;
pub mod preconditions;
pub mod sequencer;
pub mod server;
pub mod steps;
pub mod ui;
pub mod util;

#[cfg(test)]
pub mod testing;

pub use webinstall_common as common;
