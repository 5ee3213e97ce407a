pub mod bucket;
pub mod links;
pub mod reconcile;
pub mod recording;
pub mod service;
pub mod view;
pub mod zoom;

pub use bucket::*;
pub use links::*;
pub use reconcile::*;
pub use recording::*;
pub use service::*;
pub use view::*;
