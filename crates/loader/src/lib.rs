pub mod cycle;
pub mod loader;

pub use cycle::*;
pub use loader::*;
