#![forbid(unsafe_code)]

mod clock;
mod error;

pub use clock::{Clock, Expiry, ManualClock, SystemClock};
pub use error::*;

pub const DEFAULT_PORT: u16 = 11211;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const MAX_CONNECTIONS: usize = 1024;
pub const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024; // 4 KB
pub const MAX_LINE_LENGTH: usize = 2048;
pub const MAX_KEY_LENGTH: usize = 250;
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
/// Exptimes até 30 dias são relativos; acima disso, timestamp Unix absoluto.
pub const RELATIVE_EXPIRY_LIMIT_SECS: i64 = 60 * 60 * 24 * 30;
