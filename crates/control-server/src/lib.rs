pub mod control_api;
pub mod coordinator;
pub mod station;

pub use control_api::ControlServer;
pub use coordinator::{Coordinator, SharedCoordinator};
pub use station::{DownloadRoute, Station};
