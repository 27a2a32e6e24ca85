//! Generic utility primitives with zero deployment knowledge.
//!
//! - `command` - Typed remote command and fail-fast chain builder
//! - `io` - Local file I/O with consistent error handling
//! - `shell` - POSIX shell quoting
//! - `template` - `{{placeholder}}` rendering
//! - `validation` - Config field validation helpers

pub mod command;
pub mod io;
pub mod shell;
pub mod template;
pub mod validation;
