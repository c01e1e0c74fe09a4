//! Domain types for the chat orchestration core

mod function_call;
mod message;
mod response;
mod trace;
mod turn;

pub use function_call::*;
pub use message::*;
pub use response::*;
pub use trace::*;
pub use turn::*;
