pub mod cycle;
pub mod metrics;
pub mod segment;
pub mod tracker;

pub use cycle::*;
pub use metrics::*;
pub use segment::*;
pub use tracker::*;
