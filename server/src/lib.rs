//! Driving session server library.
//!
//! The server is the synchronization layer between clients: it assigns
//! participant ids and puts joins, leaves, inputs and ticks into one order
//! that every client replays. This module exposes the components for use in
//! tests and binaries.

pub mod config;
pub mod game_loop;
pub mod state;
pub mod ws;
