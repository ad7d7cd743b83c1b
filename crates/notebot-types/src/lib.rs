//! Shared message types and error hierarchy for NoteBot.

pub mod error;
pub mod message;
pub mod util;

pub use error::{ConfigError, StorageError, ValidationError};
pub use message::*;
pub use util::truncate_chars;
