#![forbid(unsafe_code)]

mod db;
mod entry;
mod resolve;

pub use db::Db;
pub use entry::Entry;
pub use resolve::Resolve;
