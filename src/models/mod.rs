pub mod club;
pub mod common;
pub mod event;
pub mod user;

pub use club::*;
pub use common::*;
pub use event::*;
pub use user::*;
