pub mod api;
pub mod display;
pub mod export;
pub mod geojson;
pub mod isochrone;
pub mod normalize;
pub mod permalink;
pub mod polyline;
pub mod profile;
pub mod route;

pub use api::*;
pub use display::*;
pub use export::*;
pub use geojson::*;
pub use isochrone::*;
pub use normalize::*;
pub use permalink::*;
pub use profile::*;
pub use route::*;
