//! CLI command implementations

pub mod create;
pub mod inspect;

pub use create::execute as create;
pub use inspect::execute as inspect;
