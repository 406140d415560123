//! Database models split into domain-specific modules.

pub mod booking;
pub mod common;
pub mod train;
pub mod user;

pub use booking::*;
pub use common::*;
pub use train::*;
pub use user::*;
