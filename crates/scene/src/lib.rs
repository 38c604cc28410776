pub mod actions;
pub mod highlight;
pub mod settings;
pub mod show;
pub mod state;
pub mod waypoints;

pub use actions::*;
pub use highlight::*;
pub use settings::*;
pub use show::*;
pub use state::*;
pub use waypoints::*;
