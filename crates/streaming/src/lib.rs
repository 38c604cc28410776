pub mod error;
pub mod protocol;
pub mod request;
pub mod tracker;

pub use error::*;
pub use protocol::*;
pub use request::*;
pub use tracker::*;
