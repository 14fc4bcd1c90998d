//! rpcd - a ratpoison control daemon.
//!
//! rpcd keeps the frames of one or more ratpoison displays filled with the
//! right programs. An automation script, re-run whenever a variable changes
//! or a managed process exits, decides which layout each display shows and
//! which window goes into which frame. The controller starts, raises and
//! stops processes until the screens match.
//!
//! Variables are written over a Unix socket or a FIFO (`name=value` lines);
//! the socket also answers JSON requests for starting explicit commands and
//! inspecting state.

pub mod actor;
pub mod automation;
pub mod cli;
pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod logging;
pub mod platform;
pub mod signals;
pub mod state;
pub mod supervisor;
pub mod variables;
pub mod wm;

#[cfg(test)]
mod testing;
