/// HTTP control surface for the station
///
/// REST endpoints for playback control, status and downloads

pub mod routes;
pub mod server;
pub mod types;

pub use server::ControlServer;
pub use types::*;
