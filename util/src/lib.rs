pub mod archive;
pub mod codec;
pub mod error;
pub mod fsops;
pub mod locator;
pub mod partition;
pub mod roster;
pub mod temp;

pub use error::UtilError;
