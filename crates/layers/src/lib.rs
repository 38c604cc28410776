pub mod layer;
pub mod narrative;
pub mod reconcile;
pub mod symbology;

pub use layer::*;
pub use narrative::*;
pub use reconcile::*;
pub use symbology::*;
