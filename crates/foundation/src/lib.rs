pub mod bounds;
pub mod coords;
pub mod geodesy;
pub mod screen;
pub mod time;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use coords::*;
pub use geodesy::*;
pub use screen::*;
pub use time::*;
