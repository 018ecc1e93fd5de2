//! Core message and completion types.

pub mod completion;
pub mod message;

pub use completion::*;
pub use message::*;
