pub mod thresholds;
pub mod loader;
pub mod profiles;

pub use thresholds::*;
pub use loader::*;
pub use profiles::*;
