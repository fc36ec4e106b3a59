//! Everything that touches the file system, the terminal or the runtime.
pub(crate) mod commands;
pub(crate) mod logging;
mod repository;
mod source_file;
