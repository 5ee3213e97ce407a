pub mod config;
pub mod protocol;
pub mod query;
pub mod transport;

pub use config::*;
pub use protocol::*;
pub use query::*;
pub use transport::*;
