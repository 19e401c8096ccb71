//! Core data types for the coinwatch alert bot.

pub mod access;
pub mod alert;
pub mod symbols;

pub use access::*;
pub use alert::*;
pub use symbols::*;
