//! Process backend: a local mpv player controlled over its JSON IPC socket
//!
//! Unix only (the IPC channel is a unix domain socket).

pub mod models;
pub mod mpv;

pub use mpv::{MpvConfig, MpvController};
