pub mod trading;
pub mod trade;
pub mod grade;

pub use trading::*;
pub use trade::*;
pub use grade::*;
