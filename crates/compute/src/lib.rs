pub mod chart;
pub mod heightgraph;
pub mod viewport;

pub use chart::*;
pub use heightgraph::*;
pub use viewport::*;
