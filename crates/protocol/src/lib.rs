#![forbid(unsafe_code)]

mod command;
mod frame;
mod parse;
mod reply;

pub use command::Command;
pub use frame::Frame;
pub use parse::Parse;
pub use reply::Reply;
