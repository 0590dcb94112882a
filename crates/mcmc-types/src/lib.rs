pub mod domain;
pub mod protocol;

pub use domain::*;
pub use protocol::*;
