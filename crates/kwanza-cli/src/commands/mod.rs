//! Command implementations

mod core;
mod import;
mod serve;

pub use self::core::{cmd_init, open_db};
pub use self::import::cmd_import;
pub use self::serve::cmd_serve;
