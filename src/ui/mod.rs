//! Terminal output helpers
//!
//! Styled output on interactive terminals, bracketed plain markers in CI and
//! when output is piped.

mod context;
mod output;

pub use context::UiContext;
pub use output::{intro, key_value, outro_success, section, step_info, step_ok};
