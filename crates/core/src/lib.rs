pub mod config;
pub mod error;
pub mod measurement;

pub use config::KbConfig;
pub use error::*;
pub use measurement::*;
