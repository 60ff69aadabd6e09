//! Data models for the awards voting application.
//!
//! These models are the wire contract shared by the server handlers and the client SDK.

mod account;
mod category;
mod theme;
mod vote;

pub use account::*;
pub use category::*;
pub use theme::*;
pub use vote::*;
