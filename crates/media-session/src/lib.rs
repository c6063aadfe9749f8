//! Desktop media-bus backend
//!
//! Controls whichever application currently owns the MPRIS media-control bus
//! (Linux, D-Bus session bus). Used for streaming-service tracks played by the
//! native desktop client and for ordered navigation (next/previous).

mod parse;
pub mod mpris;

pub use mpris::{filter_players, MprisBackend, MprisConfig, DEFAULT_SETTLE_DELAY};
pub use parse::{parse_metadata, parse_player_names, parse_property, VariantValue};
