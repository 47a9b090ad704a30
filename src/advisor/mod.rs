//! Context and reply strategies for the advisory chat that sits on top of
//! the analytics engine.

pub mod context;
pub mod responder;

pub use context::*;
pub use responder::*;
