pub mod error;
pub mod models;
pub mod resolver;
pub mod session;
pub mod traits;

pub use error::*;
pub use models::*;
pub use resolver::*;
pub use session::*;
pub use traits::*;
