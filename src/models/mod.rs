pub mod asset;
pub mod thumbnail;

pub use asset::*;
pub use thumbnail::*;
