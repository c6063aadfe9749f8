//! Daemon backend: MPD driven through the `mpc` command-line client

pub mod models;
pub mod mpd;

pub use mpd::{MpdConfig, MpdController};
